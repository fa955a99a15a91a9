use reviewmail_core::error::CoreError;

/// A template could not be found or rendered.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template not registered: {0}")]
    Missing(String),

    #[error("Failed to render template {name}: {reason}")]
    Render { name: String, reason: String },
}

/// The mail transport refused or failed to deliver a message.
#[derive(Debug, thiserror::Error)]
pub enum EmailDeliveryError {
    #[error("Email delivery is disabled")]
    Disabled,

    #[error("Invalid address {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Failure that aborts one notification. Per-recipient problems never
/// surface here; they are logged and the recipient is skipped.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to load star labels: {0}")]
    Stars(#[source] CoreError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Delivery(#[from] EmailDeliveryError),
}
