#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_channel::Sender;
use dbus::channel::Token;
use dbus::message::MatchRule;
use dbus::Message;
use freedesktop_notifier::bus::{NOTIFICATIONS_DBUS_INTERFACE, NOTIFICATIONS_DBUS_OBJECT};
use freedesktop_notifier::Transport;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub member: String,
    pub signature: String,
    /// First argument when it is a `u32` (the id of `CloseNotification`).
    pub id_arg: Option<u32>,
}

/// In-memory transport: answers calls like a notification server and lets the
/// test inject signals as if they came off the bus.
#[derive(Default)]
pub struct StubTransport {
    pub calls: Mutex<Vec<RecordedCall>>,
    pub matches: Mutex<Vec<String>>,
    pub remove_match_calls: AtomicUsize,
    sinks: Mutex<HashMap<usize, Sender<Message>>>,
    next_token: AtomicUsize,
    next_id: AtomicU32,
    fail_calls: Option<(&'static str, &'static str)>,
    fail_add_match: bool,
    fail_remove_match: bool,
}

impl StubTransport {
    /// Notify answers with `first_id`, then `first_id + 1`, ...
    pub fn new(first_id: u32) -> Self {
        Self {
            next_id: AtomicU32::new(first_id),
            ..Default::default()
        }
    }

    pub fn failing_calls(name: &'static str, message: &'static str) -> Self {
        Self {
            fail_calls: Some((name, message)),
            ..Self::new(1)
        }
    }

    pub fn failing_add_match() -> Self {
        Self {
            fail_add_match: true,
            ..Self::new(1)
        }
    }

    pub fn failing_remove_match() -> Self {
        Self {
            fail_remove_match: true,
            ..Self::new(1)
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn receiver_count(&self) -> usize {
        self.sinks.lock().unwrap().len()
    }

    pub fn match_count(&self) -> usize {
        self.matches.lock().unwrap().len()
    }

    /// Delivers `msg` to every active receiver, like the bus reader would.
    pub fn emit(&self, msg: Message) {
        let sinks = self.sinks.lock().unwrap();
        for sink in sinks.values() {
            let copy = msg.duplicate().unwrap();
            let _ = sink.try_send(copy);
        }
    }

    /// Drops every receiver, as a torn-down connection would.
    pub fn disconnect(&self) {
        self.sinks.lock().unwrap().clear();
    }
}

impl Transport for StubTransport {
    fn call(&self, mut message: Message) -> Result<Message, dbus::Error> {
        let member = message.member().map(|m| m.to_string()).unwrap_or_default();

        self.calls.lock().unwrap().push(RecordedCall {
            member: member.clone(),
            signature: message.get_items().iter().map(|item| item.signature().to_string()).collect(),
            id_arg: message.get1::<u32>(),
        });

        if let Some((name, text)) = self.fail_calls {
            return Err(dbus::Error::new_custom(name, text));
        }

        message.set_serial(1);
        let reply = message.method_return();

        Ok(match member.as_str() {
            "Notify" => reply.append1(self.next_id.fetch_add(1, Ordering::SeqCst)),
            "GetCapabilities" => reply.append1(vec!["body".to_owned(), "actions".to_owned()]),
            "GetServerInformation" => reply.append2("stub", "tests").append2("0.1", "1.2"),
            _ => reply,
        })
    }

    fn add_match(&self, rule: &MatchRule<'static>) -> Result<(), dbus::Error> {
        if self.fail_add_match {
            return Err(dbus::Error::new_custom("org.freedesktop.DBus.Error.AccessDenied", "no match for you"));
        }

        self.matches.lock().unwrap().push(rule.match_str());
        Ok(())
    }

    fn remove_match(&self, rule: &MatchRule<'static>) -> Result<(), dbus::Error> {
        self.remove_match_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_remove_match {
            return Err(dbus::Error::new_custom("org.freedesktop.DBus.Error.MatchRuleNotFound", "gone"));
        }

        let rule = rule.match_str();
        self.matches.lock().unwrap().retain(|m| *m != rule);
        Ok(())
    }

    fn start_receive(&self, _rule: MatchRule<'static>, sink: Sender<Message>) -> Token {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().insert(token, sink);
        Token(token)
    }

    fn stop_receive(&self, token: Token) -> bool {
        self.sinks.lock().unwrap().remove(&token.0).is_some()
    }
}

pub fn signal(member: &'static str) -> Message {
    Message::signal(
        &NOTIFICATIONS_DBUS_OBJECT.into(),
        &NOTIFICATIONS_DBUS_INTERFACE.into(),
        &member.into(),
    )
}

pub fn closed_signal(id: u32, reason: u32) -> Message {
    signal("NotificationClosed").append2(id, reason)
}

pub fn action_signal(id: u32, key: &str) -> Message {
    signal("ActionInvoked").append2(id, key)
}
