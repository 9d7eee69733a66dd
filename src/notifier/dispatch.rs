use std::panic::{catch_unwind, AssertUnwindSafe};

use async_channel::Receiver;
use dbus::Message;

use crate::protocol::{self, ActionInvoked, NotificationClosed, Signal};

pub type ClosedHandler = Box<dyn FnMut(NotificationClosed) + Send + 'static>;
pub type ActionHandler = Box<dyn FnMut(ActionInvoked) + Send + 'static>;

pub(super) struct Handlers {
    pub on_closed: ClosedHandler,
    pub on_action: ActionHandler,
}

impl Handlers {
    fn dispatch(&mut self, msg: &Message) {
        match protocol::decode_signal(msg) {
            Signal::Closed(event) => {
                tracing::debug!(id = event.id, reason = %event.reason, "Notification closed");
                let on_closed = &mut self.on_closed;
                isolate("closed", || on_closed(event));
            }

            Signal::ActionInvoked(event) => {
                tracing::debug!(id = event.id, action_key = %event.action_key, "Notification action invoked");
                let on_action = &mut self.on_action;
                isolate("action", || on_action(event));
            }

            Signal::Unrecognized(what) => {
                tracing::debug!(signal = %what, "Ignoring unrecognized notification signal");
            }
        }
    }
}

/// Runs a handler so that a panic inside it does not take the loop down.
fn isolate(kind: &'static str, handler: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(handler)).is_err() {
        tracing::error!(handler = kind, "Notification event handler panicked");
    }
}

/// Drains the signal queue into the handlers until shutdown is requested or
/// the queue is closed by the transport.
pub(super) struct DispatchLoop {
    pub messages: Receiver<Message>,
    pub shutdown: Receiver<()>,
    pub handlers: Handlers,
}

impl DispatchLoop {
    pub(super) async fn run(self) {
        let DispatchLoop {
            messages,
            shutdown,
            mut handlers,
        } = self;

        loop {
            tokio::select! {
                // Shutdown wins over pending messages; the queue is not drained.
                biased;

                _ = shutdown.recv() => {
                    tracing::debug!("Close requested, stopping event dispatch");
                    return;
                }

                msg = messages.recv() => match msg {
                    Ok(msg) => handlers.dispatch(&msg),
                    Err(_) => {
                        tracing::debug!("Signal queue closed, stopping event dispatch");
                        return;
                    }
                },
            }
        }
    }
}
