//! Fallback transport that only logs what would have been sent.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reviewmail_notify::{EmailDeliveryError, MailSender, OutgoingMessage};

/// Used when SMTP is not configured.
#[derive(Debug, Default)]
pub struct LogMailSender {
    logged: AtomicUsize,
}

impl LogMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages logged so far.
    pub fn logged(&self) -> usize {
        self.logged.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(&self, message: OutgoingMessage) -> Result<(), EmailDeliveryError> {
        let join = |list: &[reviewmail_core::address::Address]| {
            list.iter()
                .map(|a| a.email.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        tracing::info!(
            message_class = %message.message_class,
            subject = %message.subject,
            to = %join(&message.to),
            cc = %join(&message.cc),
            bcc = %join(&message.bcc),
            "SMTP not configured, logging notification instead of sending"
        );
        self.logged.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
