//! The notification entry point.
//!
//! [`ChangeNotifier::notify`] turns one [`ChangeEvent`] into zero or more
//! sent messages: it resolves the notify scope, runs the event's recipient
//! policy, renders the message and hands it to the [`MailSender`].

use std::fmt;
use std::sync::Arc;

use reviewmail_core::backend::{
    AccountDirectory, ChangePermissions, FilterParser, GroupBackend, ProjectDirectory,
    StarredChanges,
};
use reviewmail_core::change::ChangeSnapshot;
use reviewmail_core::notify::NotifyHandling;

use crate::change_email::ChangeEmail;
use crate::config::NotifySettings;
use crate::error::NotifyError;
use crate::event::{ChangeEvent, ChangeEventKind};
use crate::outgoing::MessageAssembler;
use crate::policy::{policy_for, EventPolicy, NEW_CHANGE};
use crate::scope::resolve_handling;
use crate::sender::MailSender;
use crate::templates::TemplateRenderer;

/// Everything the notifier consults. Shared, read-only.
#[derive(Clone)]
pub struct Collaborators {
    pub accounts: Arc<dyn AccountDirectory>,
    pub groups: Arc<dyn GroupBackend>,
    pub projects: Arc<dyn ProjectDirectory>,
    pub stars: Arc<dyn StarredChanges>,
    pub permissions: Arc<dyn ChangePermissions>,
    pub filters: Arc<dyn FilterParser>,
    pub sender: Arc<dyn MailSender>,
    pub renderer: Arc<dyn TemplateRenderer>,
}

impl Collaborators {
    /// Use one store for every lookup.
    pub fn from_store<S>(
        store: Arc<S>,
        sender: Arc<dyn MailSender>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self
    where
        S: AccountDirectory
            + GroupBackend
            + ProjectDirectory
            + StarredChanges
            + ChangePermissions
            + FilterParser
            + 'static,
    {
        Self {
            accounts: store.clone(),
            groups: store.clone(),
            projects: store.clone(),
            stars: store.clone(),
            permissions: store.clone(),
            filters: store,
            sender,
            renderer,
        }
    }
}

/// Why a message was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The mail sender is switched off.
    SenderDisabled,
    /// Notify scope `NONE` and no explicitly named accounts.
    ScopeNone,
    /// Empty body, no recipients, or only the actor.
    NothingToSend,
    /// Every recipient was removed by delivery preferences.
    NoRecipientsLeft,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SenderDisabled => "sender disabled",
            Self::ScopeNone => "notify scope none",
            Self::NothingToSend => "nothing to send",
            Self::NoRecipientsLeft => "no recipients left",
        };
        f.write_str(s)
    }
}

/// Result of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Delivered; `recipients` counts every envelope recipient across the
    /// HTML and plaintext copies.
    Sent {
        message_class: &'static str,
        recipients: usize,
    },
    Skipped {
        message_class: &'static str,
        reason: SkipReason,
    },
}

impl SendOutcome {
    pub fn message_class(&self) -> &'static str {
        match self {
            Self::Sent { message_class, .. } | Self::Skipped { message_class, .. } => {
                message_class
            }
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Sends the notification mail for change events.
pub struct ChangeNotifier {
    deps: Collaborators,
    settings: NotifySettings,
}

impl ChangeNotifier {
    pub fn new(deps: Collaborators, settings: NotifySettings) -> Self {
        Self { deps, settings }
    }

    pub fn settings(&self) -> &NotifySettings {
        &self.settings
    }

    /// Send every message the event calls for.
    ///
    /// A revert produces two messages in order: the new-change message for
    /// the revert itself, then the revert notice on the original change.
    pub async fn notify(&self, event: &ChangeEvent) -> Result<Vec<SendOutcome>, NotifyError> {
        let handling = resolve_handling(event);
        let mut outcomes = Vec::new();

        if let ChangeEventKind::Reverted { revert } = &event.kind {
            outcomes.push(self.send_one(event, revert, &NEW_CHANGE, handling).await?);
        }
        let policy = policy_for(&event.kind);
        outcomes.push(self.send_one(event, &event.change, policy, handling).await?);

        Ok(outcomes)
    }

    async fn send_one(
        &self,
        event: &ChangeEvent,
        change: &ChangeSnapshot,
        policy: &'static EventPolicy,
        handling: NotifyHandling,
    ) -> Result<SendOutcome, NotifyError> {
        let message_class = policy.message_class;
        let skipped = |reason: SkipReason| -> Result<SendOutcome, NotifyError> {
            tracing::debug!(
                change_id = %change.id,
                message_class,
                reason = %reason,
                "Not sending change email"
            );
            Ok(SendOutcome::Skipped {
                message_class,
                reason,
            })
        };

        if !self.deps.sender.is_enabled() {
            return skipped(SkipReason::SenderDisabled);
        }
        if handling == NotifyHandling::None && event.notify_accounts.is_empty() {
            return skipped(SkipReason::ScopeNone);
        }

        let mut email = ChangeEmail::new(&self.deps, event, change, policy, handling)?;
        email.populate();

        let assembler =
            MessageAssembler::new(&self.deps, &self.settings, event, change, message_class);
        let rendered = assembler.render()?;

        if !email
            .recipients()
            .should_send(&rendered.text_body, event.actor, &event.notify_accounts)
        {
            return skipped(SkipReason::NothingToSend);
        }

        let (recipients, admission) = email.parts_mut();
        let plaintext = recipients.finalize(
            assembler.actor(),
            &event.notify_accounts,
            self.deps.accounts.as_ref(),
            admission,
            self.settings.html,
        );
        if recipients.is_empty() && plaintext.is_empty() {
            return skipped(SkipReason::NoRecipientsLeft);
        }

        let reply_to = assembler.reply_to(&[&*recipients, &plaintext]);
        let mut sent = 0;
        if !recipients.is_empty() {
            let message = assembler.build(&rendered, recipients, &reply_to, false);
            sent += recipients.len();
            self.deps.sender.send(message).await?;
        }
        if !plaintext.is_empty() {
            let message = assembler.build(&rendered, &plaintext, &reply_to, true);
            sent += plaintext.len();
            self.deps.sender.send(message).await?;
        }

        tracing::info!(
            change_id = %change.id,
            message_class,
            recipients = sent,
            "Change email sent"
        );
        Ok(SendOutcome::Sent {
            message_class,
            recipients: sent,
        })
    }
}
