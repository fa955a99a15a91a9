//! JSON site description loaded into a [`MemoryStore`].
//!
//! ```json
//! {
//!   "accounts": [
//!     { "id": 1, "full_name": "Owner", "preferred_email": "owner@example.com",
//!       "watches": [{ "project": "app", "notify": ["ALL_COMMENTS"] }] }
//!   ],
//!   "groups": [],
//!   "projects": [{ "name": "app", "owner_groups": [] }],
//!   "stars": [{ "change": 10, "account": 1, "labels": ["star"] }]
//! }
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use reviewmail_core::account::{AccountState, ProjectWatch};
use reviewmail_core::group::GroupDescription;
use reviewmail_core::project::ProjectState;
use reviewmail_core::types::{AccountId, ChangeId};
use serde::Deserialize;

use crate::memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read site fixture: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed site fixture: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountFixture {
    #[serde(flatten)]
    pub account: AccountState,
    #[serde(default)]
    pub watches: Vec<ProjectWatch>,
    #[serde(default = "default_true")]
    pub can_email_reviewers: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct StarFixture {
    pub change: ChangeId,
    pub account: AccountId,
    pub labels: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteFixture {
    #[serde(default)]
    pub accounts: Vec<AccountFixture>,
    #[serde(default)]
    pub groups: Vec<GroupDescription>,
    #[serde(default)]
    pub projects: Vec<ProjectState>,
    #[serde(default)]
    pub stars: Vec<StarFixture>,
}

impl SiteFixture {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn into_store(self) -> MemoryStore {
        let mut store = MemoryStore::new();
        for fixture in self.accounts {
            let id = fixture.account.id;
            store.insert_account(fixture.account);
            for watch in fixture.watches {
                store.insert_watch(id, watch);
            }
            if !fixture.can_email_reviewers {
                store.deny_email_reviewers(id);
            }
        }
        for group in self.groups {
            store.insert_group(group);
        }
        for project in self.projects {
            store.insert_project(project);
        }
        for star in self.stars {
            for label in &star.labels {
                store.star(star.change, star.account, label);
            }
        }
        tracing::debug!(accounts = store.account_count(), "Site fixture loaded");
        store
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
