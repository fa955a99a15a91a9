//! Shared fixtures for the router tests.

#![allow(dead_code)]

use std::sync::Arc;

use reviewmail_core::account::{AccountState, ProjectWatch};
use reviewmail_core::change::ChangeSnapshot;
use reviewmail_core::notify::NotifyType;
use reviewmail_core::types::{AccountId, ChangeId, ProjectName};
use reviewmail_events::LogMailSender;
use reviewmail_notify::{ChangeNotifier, Collaborators, HandlebarsRenderer, NotifySettings};
use reviewmail_store::MemoryStore;

pub const OWNER: AccountId = AccountId(1);
pub const REVIEWER: AccountId = AccountId(2);
pub const WATCHER: AccountId = AccountId(3);

pub fn project() -> ProjectName {
    ProjectName::new("infra/deploy")
}

pub fn store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store
        .insert_account(AccountState::new(OWNER, "Owner", "owner@example.com"))
        .insert_account(AccountState::new(REVIEWER, "Reviewer", "reviewer@example.com"))
        .insert_account(AccountState::new(WATCHER, "Watcher", "watcher@example.com"))
        .insert_watch(WATCHER, ProjectWatch::new(project(), [NotifyType::All]));
    store
}

pub fn change(id: i64) -> ChangeSnapshot {
    ChangeSnapshot::new(
        ChangeId(id),
        format!("I{id:040}"),
        project(),
        OWNER,
        "Roll out the new config",
    )
    .with_reviewer(REVIEWER)
}

pub fn notifier() -> (ChangeNotifier, Arc<LogMailSender>) {
    let sender = Arc::new(LogMailSender::new());
    let renderer = Arc::new(HandlebarsRenderer::new().expect("built-in templates compile"));
    let deps = Collaborators::from_store(Arc::new(store()), sender.clone(), renderer);
    (ChangeNotifier::new(deps, NotifySettings::default()), sender)
}
