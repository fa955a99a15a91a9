//! Seam between message assembly and the mail transport.

use async_trait::async_trait;
use reviewmail_core::address::Address;

use crate::error::EmailDeliveryError;

/// A fully assembled message, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: Address,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    /// Envelope-only recipients, never written to a header.
    pub bcc: Vec<Address>,
    pub subject: String,
    /// Extra headers in emission order. `From`, `To`, `Cc` and `Subject`
    /// are carried by the fields above.
    pub headers: Vec<(String, String)>,
    pub text_body: String,
    pub html_body: Option<String>,
    pub message_class: String,
}

impl OutgoingMessage {
    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every envelope recipient across TO, CC and BCC.
    pub fn envelope(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }
}

#[async_trait]
pub trait MailSender: Send + Sync {
    /// When false, notifications are computed but never sent.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Site policy on destination addresses (allowed/denied domains).
    fn can_email(&self, _email: &str) -> bool {
        true
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), EmailDeliveryError>;
}
