//! Encoding of outgoing calls and decoding of replies and signals for the
//! `org.freedesktop.Notifications` interface.

use std::fmt;

use dbus::arg::PropMap;
use dbus::message::MessageType;
use dbus::Message;

use crate::bus::{self, NOTIFICATIONS_DBUS_INTERFACE, SIGNAL_ACTION_INVOKED, SIGNAL_NOTIFICATION_CLOSED};
use crate::error::{Error, Result};
use crate::hints;
use crate::notification::Notification;

/// Why the server closed a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    Expired,
    DismissedByUser,
    ClosedByCall,
    /// Reason `4`, and any code the protocol does not define. There is no
    /// separate "other" variant: undefined codes are folded in here.
    Unknown,
}

impl From<u32> for CloseReason {
    fn from(code: u32) -> Self {
        match code {
            1 => CloseReason::Expired,
            2 => CloseReason::DismissedByUser,
            3 => CloseReason::ClosedByCall,
            _ => CloseReason::Unknown,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CloseReason::Expired => "Expired",
            CloseReason::DismissedByUser => "DismissedByUser",
            CloseReason::ClosedByCall => "ClosedByCall",
            CloseReason::Unknown => "Unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationClosed {
    pub id: u32,
    pub reason: CloseReason,
}

/// One of the action keys sent with a notification was activated.
///
/// Many servers also close the notification when an action is invoked, so an
/// `ActionInvoked` is often accompanied by a `NotificationClosed` for the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionInvoked {
    pub id: u32,
    pub action_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInformation {
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub spec_version: String,
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Closed(NotificationClosed),
    ActionInvoked(ActionInvoked),
    /// Anything else, with a description of what was seen.
    Unrecognized(String),
}

/// Positional arguments of `Notify`, in order.
#[derive(Debug)]
pub struct PublishArgs {
    pub app_name: String,
    pub replaces_id: u32,
    pub app_icon: String,
    pub summary: String,
    pub body: String,
    pub actions: Vec<String>,
    pub hints: PropMap,
    pub expire_timeout: i32,
}

impl PublishArgs {
    /// The `Notify` method call, signature `susssasa{sv}i`.
    pub fn into_message(self) -> Message {
        bus::method_call(bus::METHOD_NOTIFY)
            .append3(self.app_name, self.replaces_id, self.app_icon)
            .append3(self.summary, self.body, self.actions)
            .append2(self.hints, self.expire_timeout)
    }
}

pub fn encode_publish(notification: &Notification) -> Result<PublishArgs> {
    if notification.actions.len() % 2 != 0 {
        return Err(Error::InvalidArgument(format!(
            "actions must be (key, label) pairs, got {} elements",
            notification.actions.len()
        )));
    }

    Ok(PublishArgs {
        app_name: notification.app_name.clone(),
        replaces_id: notification.replaces_id,
        app_icon: notification.app_icon.clone(),
        summary: notification.summary.clone(),
        body: notification.body.clone(),
        actions: notification.actions.clone(),
        hints: hints::to_prop_map(&notification.hints),
        expire_timeout: notification.expire_timeout.as_millis(),
    })
}

pub fn encode_close(id: u32) -> Message {
    bus::method_call(bus::METHOD_CLOSE_NOTIFICATION).append1(id)
}

pub fn decode_notify_reply(reply: &Message) -> Result<u32> {
    reply.read1::<u32>().map_err(|err| Error::Reply {
        method: bus::METHOD_NOTIFY,
        message: err.to_string(),
    })
}

pub fn decode_capabilities_reply(reply: &Message) -> Result<Vec<String>> {
    reply.read1::<Vec<String>>().map_err(|err| Error::Reply {
        method: bus::METHOD_GET_CAPABILITIES,
        message: err.to_string(),
    })
}

pub fn decode_server_information_reply(reply: &Message) -> Result<ServerInformation> {
    let (name, vendor, version, spec_version) = reply
        .read4::<String, String, String, String>()
        .map_err(|err| Error::Reply {
            method: bus::METHOD_GET_SERVER_INFORMATION,
            message: err.to_string(),
        })?;

    Ok(ServerInformation {
        name,
        vendor,
        version,
        spec_version,
    })
}

/// Decodes a notification signal. Never fails: anything that is not a
/// well-formed `NotificationClosed` or `ActionInvoked` comes back as
/// [`Signal::Unrecognized`].
pub fn decode_signal(msg: &Message) -> Signal {
    if msg.msg_type() != MessageType::Signal {
        return Signal::Unrecognized(format!("not a signal: {:?}", msg.msg_type()));
    }

    let interface = msg.interface();
    let member = msg.member();

    let (interface, member) = match (interface.as_deref(), member.as_deref()) {
        (Some(interface), Some(member)) => (interface, member),
        _ => return Signal::Unrecognized("signal without interface or member".to_owned()),
    };

    if interface != NOTIFICATIONS_DBUS_INTERFACE {
        return Signal::Unrecognized(format!("{}.{}", interface, member));
    }

    match member {
        SIGNAL_NOTIFICATION_CLOSED => match msg.read2::<u32, u32>() {
            Ok((id, reason)) => Signal::Closed(NotificationClosed {
                id,
                reason: reason.into(),
            }),
            Err(err) => Signal::Unrecognized(format!("malformed {}: {}", member, err)),
        },

        SIGNAL_ACTION_INVOKED => match msg.read2::<u32, String>() {
            Ok((id, action_key)) => Signal::ActionInvoked(ActionInvoked { id, action_key }),
            Err(err) => Signal::Unrecognized(format!("malformed {}: {}", member, err)),
        },

        _ => Signal::Unrecognized(format!("{}.{}", interface, member)),
    }
}
