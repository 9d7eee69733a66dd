use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{JoinHandle, ThreadId};

use async_channel::Sender;
use dbus::channel::Token;
use dbus::message::MatchRule;
use tracing::{dispatcher, Dispatch, Instrument as _};

use super::dispatch::{DispatchLoop, Handlers};
use crate::bus::{self, Transport};
use crate::error::{Error, Result};

/// The live signal registration on the bus plus the dispatch thread fed by it.
///
/// Created once by [`Subscription::start`]; torn down once by the first
/// [`Subscription::close`], whose result every later call returns as well.
pub(super) struct Subscription<T: Transport + ?Sized> {
    transport: Arc<T>,
    rule: MatchRule<'static>,
    token: Token,
    shutdown: Sender<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    deregistered: OnceLock<Result<()>>,
    log: Option<Dispatch>,
}

impl<T: Transport + ?Sized> Subscription<T> {
    pub(super) fn start(
        transport: Arc<T>,
        handlers: Handlers,
        name: &str,
        log: Option<Dispatch>,
    ) -> Result<Self> {
        let rule = bus::notification_signals();

        transport
            .add_match(&rule)
            .map_err(|err| Error::Subscribe(err.into()))?;

        let (sink, messages) = async_channel::unbounded();
        let token = transport.start_receive(rule.clone(), sink);

        let (shutdown, shutdown_rx) = async_channel::bounded(1);
        let dispatch = DispatchLoop {
            messages,
            shutdown: shutdown_rx,
            handlers,
        };

        let worker = match spawn_worker(dispatch, name, log.clone()) {
            Ok(worker) => worker,
            Err(err) => {
                transport.stop_receive(token);
                if let Err(err) = transport.remove_match(&rule) {
                    with_log(log.as_ref(), || {
                        tracing::warn!(%err, "Failed to remove signal match after aborted start")
                    });
                }
                return Err(err);
            }
        };

        with_log(log.as_ref(), || {
            tracing::debug!(rule = %rule.match_str(), "Subscribed to notification signals")
        });

        Ok(Self {
            transport,
            rule,
            token,
            shutdown,
            worker_id: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
            deregistered: OnceLock::new(),
            log,
        })
    }

    /// Stops the dispatch thread and removes the bus registration.
    ///
    /// Blocks until the dispatch thread has exited, including any handler it
    /// is running. Called from inside a handler it cannot wait for itself, so
    /// it only requests the stop; the loop exits once the handler returns.
    pub(super) fn close(&self) -> Result<()> {
        let result = self.deregistered.get_or_init(|| self.deregister()).clone();

        if std::thread::current().id() != self.worker_id {
            // Held across the join so concurrent callers also wait for the exit.
            let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(worker) = worker.take() {
                if worker.join().is_err() {
                    self.in_scope(|| tracing::warn!("Notification dispatch thread panicked"));
                }
            }
        }

        result
    }

    pub(super) fn is_closed(&self) -> bool {
        self.deregistered.get().is_some()
    }

    /// Runs `f` with this subscription's log dispatcher, if one was given.
    pub(super) fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        with_log(self.log.as_ref(), f)
    }

    fn deregister(&self) -> Result<()> {
        self.shutdown.close();
        self.transport.stop_receive(self.token);

        self.transport.remove_match(&self.rule).map_err(|err| {
            let err = Error::Unsubscribe(err.into());
            self.in_scope(|| tracing::warn!(%err, "Failed to remove notification signal match"));
            err
        })
    }
}

fn with_log<R>(log: Option<&Dispatch>, f: impl FnOnce() -> R) -> R {
    match log {
        Some(log) => dispatcher::with_default(log, f),
        None => f(),
    }
}

fn spawn_worker(dispatch: DispatchLoop, name: &str, log: Option<Dispatch>) -> Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|err| Error::Spawn(err.to_string()))?;

    let name = name.to_owned();

    std::thread::Builder::new()
        .name("notify-dispatch".to_owned())
        .spawn(move || {
            with_log(log.as_ref(), || {
                // Created here so the span belongs to the notifier's dispatcher.
                let span = tracing::debug_span!("notifier", name = %name);
                runtime.block_on(dispatch.run().instrument(span))
            })
        })
        .map_err(|err| Error::Spawn(err.to_string()))
}
