//! Event dispatch and mail delivery for change notifications.
//!
//! - [`EventBus`]: in-process publish/subscribe hub for
//!   [`ChangeEvent`](reviewmail_notify::ChangeEvent)s, backed by
//!   `tokio::sync::broadcast`.
//! - [`NotificationRouter`]: background task that feeds every published
//!   event to a [`ChangeNotifier`](reviewmail_notify::ChangeNotifier) and
//!   logs failures instead of propagating them.
//! - [`delivery`]: mail transports (SMTP, and a log-only fallback).

pub mod bus;
pub mod delivery;
pub mod router;

pub use bus::EventBus;
pub use delivery::email::{EmailConfig, SmtpMailSender};
pub use delivery::log::LogMailSender;
pub use router::{NotificationRouter, RouterStats};
