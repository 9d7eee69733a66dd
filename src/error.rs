//! Error types for the notification client.
//!
//! Synchronous operations return these to their caller. Problems on the event
//! path (malformed signals, panicking handlers) are logged by the dispatch
//! loop and never surface here.

use std::fmt;
use thiserror::Error;

/// A D-Bus error kept verbatim: the error name and message reported by the
/// bus or the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusError {
    pub name: Option<String>,
    pub message: Option<String>,
}

impl From<dbus::Error> for BusError {
    fn from(err: dbus::Error) -> Self {
        BusError {
            name: err.name().map(str::to_owned),
            message: err.message().map(str::to_owned),
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.message) {
            (Some(name), Some(message)) => write!(f, "{}: {}", name, message),
            (Some(name), None) => f.write_str(name),
            (None, Some(message)) => f.write_str(message),
            (None, None) => f.write_str("unknown D-Bus error"),
        }
    }
}

impl std::error::Error for BusError {}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caller input that cannot be encoded, detected before any bus traffic.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The remote call failed.
    #[error("{method} failed: {source}")]
    Call {
        method: &'static str,
        #[source]
        source: BusError,
    },

    /// The remote call succeeded but the reply had an unexpected shape.
    #[error("unexpected reply to {method}: {message}")]
    Reply {
        method: &'static str,
        message: String,
    },

    /// Could not open the session bus connection.
    #[error("failed to connect to the session bus: {0}")]
    Connect(#[source] BusError),

    /// Registering the signal match rule failed; no dispatch thread was started.
    #[error("failed to register for notification signals: {0}")]
    Subscribe(#[source] BusError),

    /// Removing the signal match rule failed. The dispatch thread is stopped regardless.
    #[error("failed to unregister notification signals: {0}")]
    Unsubscribe(#[source] BusError),

    /// The dispatch thread or its runtime could not be created.
    #[error("failed to start event dispatch: {0}")]
    Spawn(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn call(method: &'static str) -> impl FnOnce(dbus::Error) -> Error {
        move |err| Error::Call {
            method,
            source: err.into(),
        }
    }
}
