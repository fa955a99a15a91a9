//! Shared fixtures for the notification integration tests.
//!
//! The staged site has one change in `platform/tools` owned by `OWNER`, with
//! a reviewer, a CC, a reviewer and a CC that are plain addresses, a
//! starrer and a handful of watchers.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reviewmail_core::account::{AccountState, ProjectWatch};
use reviewmail_core::address::Address;
use reviewmail_core::change::{ChangeSnapshot, STAR_LABEL};
use reviewmail_core::notify::NotifyType;
use reviewmail_core::project::ProjectState;
use reviewmail_core::types::{AccountId, ChangeId, ProjectName};
use reviewmail_notify::{
    ChangeNotifier, Collaborators, EmailDeliveryError, HandlebarsRenderer, MailSender,
    NotifySettings, OutgoingMessage,
};
use reviewmail_store::MemoryStore;

pub const OWNER: AccountId = AccountId(1);
pub const REVIEWER: AccountId = AccountId(2);
pub const CCER: AccountId = AccountId(3);
pub const STARRER: AccountId = AccountId(4);
pub const ABANDON_WATCHER: AccountId = AccountId(5);
pub const COMMENT_WATCHER: AccountId = AccountId(6);
pub const OTHER: AccountId = AccountId(7);
pub const EXTRA_REVIEWER: AccountId = AccountId(8);
pub const EXTRA_CCER: AccountId = AccountId(9);
pub const WILDCARD_WATCHER: AccountId = AccountId(10);

pub const CHANGE: ChangeId = ChangeId(4711);
pub const PROJECT: &str = "platform/tools";
pub const REVIEWER_BY_EMAIL: &str = "reviewer-by-email@example.com";
pub const CCER_BY_EMAIL: &str = "ccer-by-email@example.com";

/// Local part of every fixture account's email.
pub fn email_of(id: AccountId) -> String {
    let name = match id {
        OWNER => "owner",
        REVIEWER => "reviewer",
        CCER => "ccer",
        STARRER => "starrer",
        ABANDON_WATCHER => "abandon-watcher",
        COMMENT_WATCHER => "comment-watcher",
        OTHER => "other",
        EXTRA_REVIEWER => "extra-reviewer",
        EXTRA_CCER => "extra-ccer",
        WILDCARD_WATCHER => "wildcard-watcher",
        _ => return format!("account-{id}@example.com"),
    };
    format!("{name}@example.com")
}

pub fn account(id: AccountId) -> AccountState {
    let email = email_of(id);
    let name = email.split('@').next().unwrap_or_default().replace('-', " ");
    AccountState::new(id, name, email)
}

pub fn project() -> ProjectName {
    ProjectName::new(PROJECT)
}

/// Store with every fixture account, the star on the staged change and the
/// watches.
pub fn staged_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    for id in [
        OWNER,
        REVIEWER,
        CCER,
        STARRER,
        ABANDON_WATCHER,
        COMMENT_WATCHER,
        OTHER,
        EXTRA_REVIEWER,
        EXTRA_CCER,
        WILDCARD_WATCHER,
    ] {
        store.insert_account(account(id));
    }
    store
        .insert_project(ProjectState::new(project()))
        .star(CHANGE, STARRER, STAR_LABEL)
        .insert_watch(
            ABANDON_WATCHER,
            ProjectWatch::new(project(), [NotifyType::AbandonedChanges]),
        )
        .insert_watch(
            COMMENT_WATCHER,
            ProjectWatch::new(project(), [NotifyType::AllComments]),
        );
    store
}

pub fn staged_change() -> ChangeSnapshot {
    ChangeSnapshot::new(
        CHANGE,
        "I8473b95934b5732ac55d26311a706c9c2bde9940",
        project(),
        OWNER,
        "Fix the frobnicator",
    )
        .with_reviewer(REVIEWER)
        .with_cc(CCER)
        .with_reviewer_by_email(Address::email_only(REVIEWER_BY_EMAIL))
        .with_cc_by_email(Address::email_only(CCER_BY_EMAIL))
}

/// Sender that keeps every message in memory.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<OutgoingMessage>>,
    disabled: bool,
    denied_domains: Vec<String>,
    fail: bool,
}

impl RecordingSender {
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub fn denying(domain: &str) -> Self {
        Self {
            denied_domains: vec![domain.to_string()],
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().expect("sender lock poisoned").clone()
    }

    /// The only message sent; panics otherwise.
    pub fn single(&self) -> OutgoingMessage {
        let messages = self.messages();
        assert_eq!(messages.len(), 1, "expected exactly one message: {messages:#?}");
        messages.into_iter().next().expect("one message")
    }
}

#[async_trait]
impl MailSender for RecordingSender {
    fn is_enabled(&self) -> bool {
        !self.disabled
    }

    fn can_email(&self, email: &str) -> bool {
        !self
            .denied_domains
            .iter()
            .any(|domain| email.to_ascii_lowercase().ends_with(&format!("@{domain}")))
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), EmailDeliveryError> {
        if self.fail {
            return Err(EmailDeliveryError::Transport("connection refused".to_string()));
        }
        self.sent.lock().expect("sender lock poisoned").push(message);
        Ok(())
    }
}

pub fn notifier_with(
    store: MemoryStore,
    sender: RecordingSender,
    settings: NotifySettings,
) -> (ChangeNotifier, Arc<RecordingSender>) {
    let sender = Arc::new(sender);
    let renderer = Arc::new(HandlebarsRenderer::new().expect("built-in templates compile"));
    let deps = Collaborators::from_store(Arc::new(store), sender.clone(), renderer);
    (ChangeNotifier::new(deps, settings), sender)
}

pub fn notifier(store: MemoryStore) -> (ChangeNotifier, Arc<RecordingSender>) {
    notifier_with(store, RecordingSender::default(), NotifySettings::default())
}

/// Lowercased emails of a header list.
pub fn emails(addresses: &[Address]) -> BTreeSet<String> {
    addresses
        .iter()
        .map(|a| a.email.to_ascii_lowercase())
        .collect()
}

pub fn emails_of(ids: &[AccountId]) -> BTreeSet<String> {
    ids.iter().map(|id| email_of(*id)).collect()
}

pub fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Every envelope email across all sent messages.
pub fn all_recipients(messages: &[OutgoingMessage]) -> BTreeSet<String> {
    messages
        .iter()
        .flat_map(|m| m.envelope())
        .map(|a| a.email.to_ascii_lowercase())
        .collect()
}
