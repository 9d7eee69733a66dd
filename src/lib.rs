//! Desktop notifications over the `org.freedesktop.Notifications` D-Bus
//! interface.
//!
//! The free functions in [`client`] send a notification or query the server in
//! a single round-trip. A [`Notifier`] additionally subscribes to the
//! server's `NotificationClosed` and `ActionInvoked` signals and delivers them
//! to handlers on a dedicated thread until it is closed.
//!
//! ```no_run
//! use std::sync::Arc;
//! use freedesktop_notifier::{Expiration, Notification, Notifier, NotifierConfig, SessionBus};
//!
//! # fn main() -> freedesktop_notifier::Result<()> {
//! let bus = Arc::new(SessionBus::connect()?);
//!
//! let notifier = Notifier::new(
//!     Arc::clone(&bus),
//!     NotifierConfig::default()
//!         .with_on_action(|event| println!("{} invoked on {}", event.action_key, event.id))
//!         .with_on_closed(|event| println!("{} closed: {}", event.id, event.reason)),
//! )?;
//!
//! let id = notifier.notify(
//!     &Notification::builder()
//!         .app_name("demo")
//!         .summary("Build finished")
//!         .action("open", "Open log")
//!         .expire_timeout(Expiration::Never)
//!         .build(),
//! )?;
//!
//! notifier.close_notification(id)?;
//! notifier.close()?;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod client;
pub mod error;
pub mod hints;
pub mod notification;
pub mod notifier;
pub mod protocol;

pub use bus::{BusConfig, SessionBus, Transport};
pub use client::{close_notification, get_capabilities, get_server_information, send_notification};
pub use error::{BusError, Error, Result};
pub use hints::{Hint, ImageData, Urgency};
pub use notification::{Action, Expiration, Notification, NotificationBuilder};
pub use notifier::{Notifier, NotifierConfig};
pub use protocol::{ActionInvoked, CloseReason, NotificationClosed, ServerInformation};
