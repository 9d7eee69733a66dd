mod dispatch;
mod subscription;

use std::fmt;
use std::sync::Arc;

use tracing::Dispatch;

use crate::bus::Transport;
use crate::client;
use crate::error::Result;
use crate::notification::Notification;
use crate::protocol::{ActionInvoked, NotificationClosed, ServerInformation};

pub use self::dispatch::{ActionHandler, ClosedHandler};
use self::dispatch::Handlers;
use self::subscription::Subscription;

/// Handlers and logging fixed for the lifetime of a [`Notifier`].
///
/// Both handlers default to doing nothing. They run on the notifier's
/// dispatch thread, one event at a time: a handler that blocks holds up every
/// event behind it, so long work belongs on another thread.
pub struct NotifierConfig {
    pub on_closed: ClosedHandler,
    pub on_action: ActionHandler,
    /// Where the notifier's own logs go. `None` uses the process-wide default
    /// subscriber, which is whatever the application installed.
    pub dispatch: Option<Dispatch>,
    /// Recorded on the dispatch thread's tracing span.
    pub name: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            on_closed: Box::new(|_| {}),
            on_action: Box::new(|_| {}),
            dispatch: None,
            name: "notify".to_owned(),
        }
    }
}

impl NotifierConfig {
    pub fn with_on_closed(mut self, handler: impl FnMut(NotificationClosed) + Send + 'static) -> Self {
        self.on_closed = Box::new(handler);
        self
    }

    pub fn with_on_action(mut self, handler: impl FnMut(ActionInvoked) + Send + 'static) -> Self {
        self.on_action = Box::new(handler);
        self
    }

    /// Sends this notifier's logs to `dispatch` instead of the default subscriber.
    pub fn with_dispatch(mut self, dispatch: impl Into<Dispatch>) -> Self {
        self.dispatch = Some(dispatch.into());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }
}

impl fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("name", &self.name)
            .field("dispatch", &self.dispatch.is_some())
            .finish_non_exhaustive()
    }
}

/// A notification client that also listens for `NotificationClosed` and
/// `ActionInvoked`.
///
/// The signal subscription covers the whole notifications interface, so
/// events for notifications sent by other clients on the same bus are
/// delivered too; filter by id in the handlers if that matters. Servers may
/// emit more than one event for a single user interaction (an invoked action
/// is commonly followed by a close), and nothing is de-duplicated here.
///
/// The transport is shared, not owned: closing the notifier leaves the
/// connection open. Dropping the notifier closes it.
pub struct Notifier<T: Transport + ?Sized> {
    transport: Arc<T>,
    subscription: Subscription<T>,
}

impl<T: Transport + ?Sized> Notifier<T> {
    /// Registers for notification signals and starts the dispatch thread.
    /// Fails without leaving anything running if registration fails.
    pub fn new(transport: Arc<T>, config: NotifierConfig) -> Result<Self> {
        let NotifierConfig {
            on_closed,
            on_action,
            dispatch,
            name,
        } = config;

        let handlers = Handlers { on_closed, on_action };
        let subscription = Subscription::start(Arc::clone(&transport), handlers, &name, dispatch)?;

        subscription.in_scope(|| tracing::info!(name = %name, "Notifier started"));

        Ok(Self {
            transport,
            subscription,
        })
    }

    /// See [`client::send_notification`].
    pub fn notify(&self, notification: &Notification) -> Result<u32> {
        client::send_notification(&*self.transport, notification)
    }

    /// Asks the server to close notification `id`. The resulting
    /// `NotificationClosed` arrives later through the closed handler.
    pub fn close_notification(&self, id: u32) -> Result<()> {
        client::close_notification(&*self.transport, id)
    }

    pub fn capabilities(&self) -> Result<Vec<String>> {
        client::get_capabilities(&*self.transport)
    }

    pub fn server_information(&self) -> Result<ServerInformation> {
        client::get_server_information(&*self.transport)
    }

    /// Stops event delivery and removes the signal registration.
    ///
    /// Returns once the dispatch thread has exited, so no handler runs after
    /// this returns. Safe to call more than once; every call returns the
    /// outcome of the first. A failure to unregister is reported, but event
    /// delivery is stopped regardless.
    pub fn close(&self) -> Result<()> {
        self.subscription.close()
    }

    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }
}

impl<T: Transport + ?Sized> fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<T: Transport + ?Sized> Drop for Notifier<T> {
    fn drop(&mut self) {
        // An unregistration failure has already been logged by the first close.
        let _ = self.subscription.close();
    }
}
