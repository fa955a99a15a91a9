//! Email delivery via SMTP.
//!
//! [`SmtpMailSender`] wraps the `lettre` async SMTP transport. Configuration
//! is loaded from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and no mailer should be
//! constructed.

use async_trait::async_trait;
use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MessageBuilder, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reviewmail_core::address::Address;
use reviewmail_notify::{EmailDeliveryError, MailSender, OutgoingMessage};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for SMTP delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

impl From<EmailError> for EmailDeliveryError {
    fn from(e: EmailError) -> Self {
        match e {
            EmailError::Transport(e) => EmailDeliveryError::Transport(e.to_string()),
            EmailError::Address(e) => EmailDeliveryError::Address(e.to_string()),
            EmailError::Build(reason) => EmailDeliveryError::Build(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Configuration for the SMTP transport.
#[derive(Debug, Clone, Default)]
pub struct EmailConfig {
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Domains or full addresses that may receive mail. Empty or `*`
    /// allows everything.
    pub allowed_domains: Vec<String>,
    /// Domains or full addresses that never receive mail. Checked first.
    pub denied_domains: Vec<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured.
    ///
    /// | Variable               | Required | Default |
    /// |------------------------|----------|---------|
    /// | `SMTP_HOST`            | yes      | none    |
    /// | `SMTP_PORT`            | no       | `587`   |
    /// | `SMTP_USER`            | no       | none    |
    /// | `SMTP_PASSWORD`        | no       | none    |
    /// | `SMTP_ALLOWED_DOMAINS` | no       | `*`     |
    /// | `SMTP_DENIED_DOMAINS`  | no       | none    |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            allowed_domains: domain_list(std::env::var("SMTP_ALLOWED_DOMAINS").ok()),
            denied_domains: domain_list(std::env::var("SMTP_DENIED_DOMAINS").ok()),
        })
    }

    /// Site policy on recipient addresses.
    pub fn permits(&self, email: &str) -> bool {
        let email = email.trim().to_ascii_lowercase();
        let Some((_, domain)) = email.rsplit_once('@') else {
            return false;
        };
        let listed = |entries: &[String]| {
            entries
                .iter()
                .any(|entry| entry == "*" || entry == domain || *entry == email)
        };
        if listed(&self.denied_domains) {
            return false;
        }
        self.allowed_domains.is_empty() || listed(&self.allowed_domains)
    }
}

fn domain_list(raw: Option<String>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// SmtpMailSender
// ---------------------------------------------------------------------------

/// Delivers assembled change notifications over SMTP.
pub struct SmtpMailSender {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailSender {
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: transport_builder.build(),
            config,
        })
    }

    pub fn config(&self) -> &EmailConfig {
        &self.config
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    fn can_email(&self, email: &str) -> bool {
        self.config.permits(email)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), EmailDeliveryError> {
        let recipients = message.envelope().count();
        let message_class = message.message_class.clone();
        let email = build_message(&message)?;

        self.transport
            .send(email)
            .await
            .map_err(EmailError::Transport)?;

        tracing::info!(
            message_class = %message_class,
            recipients,
            "Notification email sent"
        );
        Ok(())
    }
}

fn mailbox(address: &Address) -> Result<Mailbox, EmailError> {
    Ok(Mailbox::new(address.name.clone(), address.email.parse()?))
}

/// Turn an assembled message into a MIME message. BCC recipients end up in
/// the envelope only.
pub fn build_message(message: &OutgoingMessage) -> Result<Message, EmailError> {
    let mut builder: MessageBuilder = Message::builder()
        .from(mailbox(&message.from)?)
        .subject(message.subject.clone());

    for address in &message.to {
        builder = builder.to(mailbox(address)?);
    }
    for address in &message.cc {
        builder = builder.cc(mailbox(address)?);
    }
    for address in &message.bcc {
        builder = builder.bcc(mailbox(address)?);
    }

    for (name, value) in &message.headers {
        builder = match name.as_str() {
            // lettre stamps the date itself.
            "Date" => builder,
            "Message-ID" => builder.message_id(Some(value.clone())),
            "In-Reply-To" => builder.in_reply_to(value.clone()),
            "References" => builder.references(value.clone()),
            _ => {
                let header = HeaderName::new_from_ascii(name.clone())
                    .map_err(|e| EmailError::Build(format!("header {name}: {e}")))?;
                builder.raw_header(HeaderValue::new(header, value.clone()))
            }
        };
    }

    let built = match &message.html_body {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            message.text_body.clone(),
            html.clone(),
        )),
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.text_body.clone()),
    };
    built.map_err(|e| EmailError::Build(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn outgoing(html: Option<&str>) -> OutgoingMessage {
        OutgoingMessage {
            from: Address::new(Some("Ada (Code Review)".to_string()), "noreply@review.example.org"),
            to: vec![Address::new(Some("Owner".to_string()), "owner@example.com")],
            cc: vec![Address::email_only("reviewer@example.com")],
            bcc: vec![Address::email_only("watcher@example.com")],
            subject: "Change in demo[master]: Fix it".to_string(),
            headers: vec![
                ("Date".to_string(), "Mon, 19 Oct 2026 10:00:00 +0000".to_string()),
                ("Message-ID".to_string(), "<abc-HTML@review.example.org>".to_string()),
                ("References".to_string(), "<review.1.I01@review.example.org>".to_string()),
                ("In-Reply-To".to_string(), "<review.1.I01@review.example.org>".to_string()),
                ("X-Review-MessageType".to_string(), "comment".to_string()),
            ],
            text_body: "Ada has posted comments on this change.".to_string(),
            html_body: html.map(str::to_string),
            message_class: "comment".to_string(),
        }
    }

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn denied_entries_win_over_allowed() {
        let config = EmailConfig {
            allowed_domains: vec!["example.com".to_string()],
            denied_domains: vec!["mallory@example.com".to_string()],
            ..EmailConfig::default()
        };
        assert!(config.permits("Alice@Example.com"));
        assert!(!config.permits("mallory@example.com"));
        assert!(!config.permits("bob@elsewhere.org"));
        assert!(!config.permits("not-an-address"));
    }

    #[test]
    fn empty_allow_list_permits_everything() {
        let config = EmailConfig {
            denied_domains: vec!["spam.test".to_string()],
            ..EmailConfig::default()
        };
        assert!(config.permits("anyone@example.org"));
        assert!(!config.permits("x@spam.test"));
    }

    #[test]
    fn domain_list_trims_and_lowercases() {
        assert_eq!(
            domain_list(Some(" Example.com, ,lists.Example.org ".to_string())),
            vec!["example.com".to_string(), "lists.example.org".to_string()]
        );
        assert!(domain_list(None).is_empty());
    }

    #[test]
    fn bcc_recipients_stay_out_of_headers() {
        let email = build_message(&outgoing(None)).expect("message builds");
        let formatted = String::from_utf8(email.formatted()).expect("utf-8");

        assert_eq!(email.envelope().to().len(), 3);
        assert!(!formatted.contains("watcher@example.com"));
        assert!(formatted.contains("X-Review-MessageType: comment"));
        assert!(formatted.contains("In-Reply-To: <review.1.I01@review.example.org>"));
        assert!(formatted.contains("text/plain"));
    }

    #[test]
    fn html_messages_are_multipart_alternative() {
        let email = build_message(&outgoing(Some("<p>Hi</p>"))).expect("message builds");
        let formatted = String::from_utf8(email.formatted()).expect("utf-8");

        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("text/html"));
    }

    #[test]
    fn invalid_sender_is_an_address_error() {
        let mut message = outgoing(None);
        message.from = Address::email_only("not-an-email");

        let err = build_message(&message).expect_err("invalid from");
        assert!(err.to_string().contains("Email address parse error"));
        assert_matches!(EmailDeliveryError::from(err), EmailDeliveryError::Address(_));
    }
}
