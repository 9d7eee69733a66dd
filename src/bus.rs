//! The message-bus side of the client: well-known names, the [`Transport`]
//! seam the notifier talks through, and [`SessionBus`], a transport backed by
//! a real session connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use async_channel::Sender;
use dbus::blocking::{BlockingSender as _, SyncConnection};
use dbus::channel::{MatchingReceiver as _, Token};
use dbus::message::{MatchRule, MessageType};
use dbus::Message;

use crate::error::{Error, Result};

pub const NOTIFICATIONS_DBUS_BUS: &str = "org.freedesktop.Notifications";
pub const NOTIFICATIONS_DBUS_OBJECT: &str = "/org/freedesktop/Notifications";
pub const NOTIFICATIONS_DBUS_INTERFACE: &str = "org.freedesktop.Notifications";

pub const METHOD_NOTIFY: &str = "Notify";
pub const METHOD_CLOSE_NOTIFICATION: &str = "CloseNotification";
pub const METHOD_GET_CAPABILITIES: &str = "GetCapabilities";
pub const METHOD_GET_SERVER_INFORMATION: &str = "GetServerInformation";

pub const SIGNAL_NOTIFICATION_CLOSED: &str = "NotificationClosed";
pub const SIGNAL_ACTION_INVOKED: &str = "ActionInvoked";

/// Match rule for every signal emitted on the notifications object and
/// interface, regardless of which client created the notification.
pub fn notification_signals() -> MatchRule<'static> {
    MatchRule::new()
        .with_type(MessageType::Signal)
        .with_path(NOTIFICATIONS_DBUS_OBJECT)
        .with_interface(NOTIFICATIONS_DBUS_INTERFACE)
}

/// Builds an empty method call on the notifications object.
pub fn method_call(member: &'static str) -> Message {
    Message::method_call(
        &NOTIFICATIONS_DBUS_BUS.into(),
        &NOTIFICATIONS_DBUS_OBJECT.into(),
        &NOTIFICATIONS_DBUS_INTERFACE.into(),
        &member.into(),
    )
}

/// What the notifier needs from a bus connection.
///
/// Implementations own connection setup, framing and reply correlation. The
/// receive callback registered through [`Transport::start_receive`] must hand
/// messages to `sink` without blocking.
pub trait Transport: Send + Sync {
    /// Sends a method call and waits for its reply.
    fn call(&self, message: Message) -> std::result::Result<Message, dbus::Error>;

    /// Asks the bus daemon to route messages matching `rule` to this connection.
    fn add_match(&self, rule: &MatchRule<'static>) -> std::result::Result<(), dbus::Error>;

    /// Reverses [`Transport::add_match`].
    fn remove_match(&self, rule: &MatchRule<'static>) -> std::result::Result<(), dbus::Error>;

    /// Starts forwarding inbound messages matching `rule` into `sink`.
    fn start_receive(&self, rule: MatchRule<'static>, sink: Sender<Message>) -> Token;

    /// Stops a forwarding registered by [`Transport::start_receive`]. The
    /// transport drops its `sink` so the receiving end observes a closed queue.
    fn stop_receive(&self, token: Token) -> bool;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn call(&self, message: Message) -> std::result::Result<Message, dbus::Error> {
        (**self).call(message)
    }

    fn add_match(&self, rule: &MatchRule<'static>) -> std::result::Result<(), dbus::Error> {
        (**self).add_match(rule)
    }

    fn remove_match(&self, rule: &MatchRule<'static>) -> std::result::Result<(), dbus::Error> {
        (**self).remove_match(rule)
    }

    fn start_receive(&self, rule: MatchRule<'static>, sink: Sender<Message>) -> Token {
        (**self).start_receive(rule, sink)
    }

    fn stop_receive(&self, token: Token) -> bool {
        (**self).stop_receive(token)
    }
}

/// Settings for [`SessionBus`].
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// How long a method call may wait for its reply.
    pub call_timeout: Duration,
    /// Upper bound on a single `process` wait on the reader thread, which is
    /// also how quickly the reader notices it should stop.
    pub process_interval: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            // libdbus' own default reply timeout
            call_timeout: Duration::from_millis(25_000),
            process_interval: Duration::from_millis(1000),
        }
    }
}

/// A session-bus connection plus the reader thread that pumps inbound
/// messages into registered receivers.
pub struct SessionBus {
    connection: Arc<SyncConnection>,
    config: BusConfig,
    running: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SessionBus {
    pub fn connect() -> Result<Self> {
        Self::connect_with(BusConfig::default())
    }

    pub fn connect_with(config: BusConfig) -> Result<Self> {
        let connection = SyncConnection::new_session().map_err(|err| Error::Connect(err.into()))?;
        Self::from_connection(Arc::new(connection), config)
    }

    /// Wraps an already established connection. The connection must not be
    /// processed by anyone else while this bus is alive.
    pub fn from_connection(connection: Arc<SyncConnection>, config: BusConfig) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));

        let reader = std::thread::Builder::new()
            .name("notify-bus-reader".to_owned())
            .spawn({
                let connection = Arc::clone(&connection);
                let running = Arc::clone(&running);
                let interval = config.process_interval;

                move || {
                    while running.load(Ordering::Acquire) {
                        if let Err(err) = connection.process(interval) {
                            tracing::error!(bus = "session", %err, "Failed to process D-Bus messages, stopping reader");
                            break;
                        }
                    }

                    tracing::debug!(bus = "session", "D-Bus reader stopped");
                }
            })
            .map_err(|err| Error::Spawn(err.to_string()))?;

        tracing::info!(bus = "session", name = %connection.unique_name(), "Connected to D-Bus");

        Ok(Self {
            connection,
            config,
            running,
            reader: Mutex::new(Some(reader)),
        })
    }

    pub fn connection(&self) -> &Arc<SyncConnection> {
        &self.connection
    }
}

impl Transport for SessionBus {
    fn call(&self, message: Message) -> std::result::Result<Message, dbus::Error> {
        self.connection.send_with_reply_and_block(message, self.config.call_timeout)
    }

    fn add_match(&self, rule: &MatchRule<'static>) -> std::result::Result<(), dbus::Error> {
        self.connection.add_match_no_cb(&rule.match_str())
    }

    fn remove_match(&self, rule: &MatchRule<'static>) -> std::result::Result<(), dbus::Error> {
        self.connection.remove_match_no_cb(&rule.match_str())
    }

    fn start_receive(&self, rule: MatchRule<'static>, sink: Sender<Message>) -> Token {
        self.connection.start_receive(rule, Box::new(move |msg, _| {
            // Unbounded queue: this only fails once the receiving side is gone,
            // in which case the callback unregisters itself.
            sink.try_send(msg).is_ok()
        }))
    }

    fn stop_receive(&self, token: Token) -> bool {
        self.connection.stop_receive(token).is_some()
    }
}

impl Drop for SessionBus {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);

        let reader = self.reader.lock().ok().and_then(|mut reader| reader.take());
        if let Some(reader) = reader {
            if reader.join().is_err() {
                tracing::warn!(bus = "session", "D-Bus reader thread panicked");
            }
        }
    }
}
