//! Headers, footers and rendered bodies of a change message.

use reviewmail_core::account::AccountState;
use reviewmail_core::address::Address;
use reviewmail_core::change::ChangeSnapshot;
use reviewmail_core::notify::RecipientType;
use reviewmail_core::types::AccountId;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::{FromStrategy, NotifySettings};
use crate::error::TemplateError;
use crate::event::{ChangeEvent, ChangeEventKind, RemovedReviewer};
use crate::notifier::Collaborators;
use crate::recipients::RecipientSet;
use crate::sender::OutgoingMessage;
use crate::templates::{headline_template, BODY_TEMPLATE, HTML_BODY_TEMPLATE, SUBJECT_TEMPLATE};

/// Prefix of the machine readable headers.
pub const HEADER_PREFIX: &str = "X-Review-";

/// Prefix of the machine readable footer lines in the body.
pub const FOOTER_PREFIX: &str = "Review-";

/// Rendered content shared by every copy of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

pub struct MessageAssembler<'a> {
    deps: &'a Collaborators,
    settings: &'a NotifySettings,
    event: &'a ChangeEvent,
    change: &'a ChangeSnapshot,
    message_class: &'static str,
    actor: Option<AccountState>,
}

impl<'a> MessageAssembler<'a> {
    pub fn new(
        deps: &'a Collaborators,
        settings: &'a NotifySettings,
        event: &'a ChangeEvent,
        change: &'a ChangeSnapshot,
        message_class: &'static str,
    ) -> Self {
        let actor = event.actor.and_then(|id| deps.accounts.account(id));
        Self {
            deps,
            settings,
            event,
            change,
            message_class,
            actor,
        }
    }

    pub fn actor(&self) -> Option<&AccountState> {
        self.actor.as_ref()
    }

    pub fn render(&self) -> Result<RenderedMessage, TemplateError> {
        let renderer = self.deps.renderer.as_ref();
        let mut context = self.context();

        let headline = renderer.render(&headline_template(self.message_class), &context)?;
        context["headline"] = Value::String(headline);

        let subject = renderer.render(SUBJECT_TEMPLATE, &context)?;
        let text_body = renderer.render(BODY_TEMPLATE, &context)?;
        let html_body = if self.settings.html && renderer.has_template(HTML_BODY_TEMPLATE) {
            Some(renderer.render(HTML_BODY_TEMPLATE, &context)?)
        } else {
            None
        };

        Ok(RenderedMessage {
            subject: subject.trim().to_string(),
            text_body,
            html_body,
        })
    }

    /// Build the message for one recipient set. `plaintext_only` drops the
    /// HTML part and marks the message id. `reply_to` is shared by every
    /// copy of the message, see [`reply_to`](Self::reply_to).
    pub fn build(
        &self,
        rendered: &RenderedMessage,
        recipients: &RecipientSet,
        reply_to: &str,
        plaintext_only: bool,
    ) -> OutgoingMessage {
        let host = self.settings.mail_host();
        let variant = if plaintext_only { "PLAIN" } else { "HTML" };
        let thread_id = self.thread_id(&host);

        let mut headers: Vec<(String, String)> = vec![
            ("Date".to_string(), self.event.timestamp.to_rfc2822()),
            ("Auto-Submitted".to_string(), "auto-generated".to_string()),
            (
                "List-Id".to_string(),
                format!(
                    "<{}.{}>",
                    self.change.project.as_str().replace('/', "."),
                    host
                ),
            ),
        ];

        headers.push((
            "Message-ID".to_string(),
            format!("<{}-{variant}@{host}>", Uuid::new_v4()),
        ));
        headers.push(("References".to_string(), thread_id.clone()));
        if !self.starts_thread() {
            headers.push(("In-Reply-To".to_string(), thread_id));
        }

        headers.push(("Reply-To".to_string(), reply_to.to_string()));
        for (name, value) in self.review_fields() {
            headers.push((format!("{HEADER_PREFIX}{name}"), value));
        }

        OutgoingMessage {
            from: self.from_address(),
            to: recipients.addresses(RecipientType::To),
            cc: recipients.addresses(RecipientType::Cc),
            bcc: recipients.addresses(RecipientType::Bcc),
            subject: rendered.subject.clone(),
            headers,
            text_body: rendered.text_body.clone(),
            html_body: if plaintext_only {
                None
            } else {
                rendered.html_body.clone()
            },
            message_class: self.message_class.to_string(),
        }
    }

    /// The first message about a new change opens its mail thread and
    /// replies to nothing.
    fn starts_thread(&self) -> bool {
        self.message_class == "newchange"
            && matches!(
                self.event.kind,
                ChangeEventKind::NewChange | ChangeEventKind::Reverted { .. }
            )
    }

    fn thread_id(&self, host: &str) -> String {
        format!(
            "<review.{}.{}@{host}>",
            self.change.created_on.timestamp_millis(),
            self.change.key
        )
    }

    fn from_address(&self) -> Address {
        let server = &self.settings.from_address;
        match (self.settings.from_strategy, &self.actor) {
            (FromStrategy::Mixer, Some(actor)) => Address::new(
                Some(format!("{} (Code Review)", actor.display_name())),
                server.email.clone(),
            ),
            _ => server.clone(),
        }
    }

    /// Actor plus every TO and CC recipient across all copies of the
    /// message. BCC recipients are never listed.
    pub fn reply_to(&self, copies: &[&RecipientSet]) -> String {
        let mut emails: Vec<String> = Vec::new();
        if let Some(address) = self.actor.as_ref().and_then(AccountState::address) {
            emails.push(address.email);
        }
        for recipient in copies.iter().flat_map(|copy| copy.iter()) {
            if recipient.bucket != RecipientType::Bcc
                && !emails
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(&recipient.address.email))
            {
                emails.push(recipient.address.email.clone());
            }
        }
        if emails.is_empty() {
            emails.push(self.settings.from_address.email.clone());
        }
        emails.join(", ")
    }

    fn account_label(&self, id: AccountId) -> String {
        match self.deps.accounts.account(id) {
            Some(account) => match account.address() {
                Some(address) => address.to_string(),
                None => account.display_name(),
            },
            None => format!("Account {id}"),
        }
    }

    fn account_name(&self, id: AccountId) -> String {
        self.deps
            .accounts
            .account(id)
            .map(|a| a.display_name())
            .unwrap_or_else(|| format!("Account {id}"))
    }

    /// Machine readable fields shared by headers and footers.
    fn review_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("MessageType", self.message_class.to_string()),
            ("Project", self.change.project.to_string()),
            ("Branch", self.change.short_branch().to_string()),
            ("Change-Id", self.change.key.clone()),
            ("Change-Number", self.change.id.to_string()),
            ("PatchSet", self.change.patch_set.number.to_string()),
            ("Owner", self.account_label(self.change.owner)),
        ]
    }

    fn footers(&self) -> Vec<String> {
        let mut footers: Vec<String> = self
            .review_fields()
            .into_iter()
            .map(|(name, value)| format!("{FOOTER_PREFIX}{name}: {value}"))
            .collect();
        for id in &self.change.reviewers {
            footers.push(format!("{FOOTER_PREFIX}Reviewer: {}", self.account_label(*id)));
        }
        for id in &self.change.ccs {
            footers.push(format!("{FOOTER_PREFIX}CC: {}", self.account_label(*id)));
        }
        for address in self.change.all_by_email() {
            footers.push(format!("{FOOTER_PREFIX}CC: {address}"));
        }
        for id in &self.change.attention_set {
            footers.push(format!("{FOOTER_PREFIX}Attention: {}", self.account_label(*id)));
        }
        footers
    }

    fn context(&self) -> Value {
        let change = self.change;
        let from_name = self
            .actor
            .as_ref()
            .map(AccountState::display_name)
            .unwrap_or_else(|| "Code Review".to_string());
        let from_line = match (self.settings.from_strategy, &self.actor) {
            (FromStrategy::Server, Some(actor)) => actor
                .address()
                .map(|address| format!("From {address}:")),
            _ => None,
        };
        let url = self
            .settings
            .web_url
            .as_ref()
            .map(|base| format!("{base}/c/{}", change.id));

        let mut context = json!({
            "messageClass": self.message_class,
            "fromName": from_name,
            "instanceName": self.settings.instance_name,
            "change": {
                "number": change.id.0,
                "key": change.key,
                "project": change.project.as_str(),
                "branch": change.short_branch(),
                "subject": change.subject,
                "shortSubject": change.short_subject(),
                "status": change.status.as_str(),
                "patchSet": change.patch_set.number,
                "ownerName": self.account_name(change.owner),
            },
            "footers": self.footers(),
        });

        if let Some(line) = from_line {
            context["fromLine"] = json!(line);
        }
        if let Some(url) = url {
            context["change"]["url"] = json!(url);
        }
        if let Some(message) = self.event.message.as_deref().filter(|m| !m.trim().is_empty()) {
            context["message"] = json!(message);
        }

        match &self.event.kind {
            ChangeEventKind::ReviewerAdded {
                reviewers,
                addresses,
            } => {
                let names: Vec<String> = reviewers
                    .iter()
                    .map(|id| self.account_name(*id))
                    .chain(addresses.iter().map(|a| a.to_string()))
                    .collect();
                if !names.is_empty() {
                    context["addedReviewers"] = json!(names.join(", "));
                }
            }
            ChangeEventKind::ReviewerDeleted { reviewer, .. } => {
                context["reviewerName"] = json!(match reviewer {
                    RemovedReviewer::Account(id) => self.account_name(*id),
                    RemovedReviewer::Address(address) => address.to_string(),
                });
            }
            ChangeEventKind::VoteDeleted { reviewer, label } => {
                context["reviewerName"] = json!(self.account_name(*reviewer));
                context["label"] = json!(label);
            }
            ChangeEventKind::AssigneeChanged { assignee, .. } => {
                context["assigneeName"] = json!(self.account_name(*assignee));
            }
            _ => {}
        }

        context
    }
}
