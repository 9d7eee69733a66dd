//! One-shot calls for callers that do not care about events.
//!
//! None of these start a subscription or a background thread; each is a single
//! round-trip over the given transport.

use crate::bus::{self, Transport};
use crate::error::{Error, Result};
use crate::notification::Notification;
use crate::protocol::{self, ServerInformation};

/// Sends a notification and returns the id the server assigned to it.
///
/// The id is never `0`. When `replaces_id` is set, servers answer with that
/// same id; this is not checked here.
pub fn send_notification<T: Transport + ?Sized>(transport: &T, notification: &Notification) -> Result<u32> {
    let message = protocol::encode_publish(notification)?.into_message();
    let reply = transport.call(message).map_err(Error::call(bus::METHOD_NOTIFY))?;

    let id = protocol::decode_notify_reply(&reply)?;
    tracing::debug!(id, app_name = %notification.app_name, "Sent notification");

    Ok(id)
}

/// Asks the server to close notification `id`.
///
/// The server answers with a `NotificationClosed` signal (reason
/// `ClosedByCall`), which only a [`crate::Notifier`] observes. Closing an id the
/// server no longer knows is reported as an error by most servers.
pub fn close_notification<T: Transport + ?Sized>(transport: &T, id: u32) -> Result<()> {
    transport
        .call(protocol::encode_close(id))
        .map_err(Error::call(bus::METHOD_CLOSE_NOTIFICATION))?;

    Ok(())
}

pub fn get_capabilities<T: Transport + ?Sized>(transport: &T) -> Result<Vec<String>> {
    let reply = transport
        .call(bus::method_call(bus::METHOD_GET_CAPABILITIES))
        .map_err(Error::call(bus::METHOD_GET_CAPABILITIES))?;

    protocol::decode_capabilities_reply(&reply)
}

pub fn get_server_information<T: Transport + ?Sized>(transport: &T) -> Result<ServerInformation> {
    let reply = transport
        .call(bus::method_call(bus::METHOD_GET_SERVER_INFORMATION))
        .map_err(Error::call(bus::METHOD_GET_SERVER_INFORMATION))?;

    protocol::decode_server_information_reply(&reply)
}
