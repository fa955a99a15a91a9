//! Recipient resolution and message assembly for change notifications.
//!
//! The building blocks, leaves first:
//!
//! - [`recipients::RecipientSet`]: TO/CC/BCC accumulator with first-wins
//!   de-duplication and the self-copy rule.
//! - [`groups::GroupExpander`]: flattens nested groups into accounts and
//!   mailing-list addresses.
//! - [`filter::WatchFilter`]: evaluates watch filters as a given user.
//! - [`watchers::ProjectWatchResolver`]: account watches plus project
//!   notify-configs along the project hierarchy.
//! - [`policy`]: which recipient categories each event kind mails, and at
//!   which notify scope.
//! - [`outgoing`]: headers, footers and rendering of the final message.
//!
//! [`ChangeNotifier`] ties them together behind a single `notify` call.

pub mod change_email;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod groups;
pub mod notifier;
pub mod outgoing;
pub mod policy;
pub mod recipients;
pub mod scope;
pub mod sender;
pub mod templates;
pub mod watchers;

pub use config::{FromStrategy, NotifySettings};
pub use error::{EmailDeliveryError, NotifyError, TemplateError};
pub use event::{ChangeEvent, ChangeEventKind, RemovedReviewer};
pub use notifier::{ChangeNotifier, Collaborators, SendOutcome, SkipReason};
pub use sender::{MailSender, OutgoingMessage};
pub use templates::{HandlebarsRenderer, TemplateRenderer};
