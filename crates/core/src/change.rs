//! Read-only snapshot of a change at the time a notification is built.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::types::{AccountId, ChangeId, ProjectName, Timestamp};

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Star label marking an ordinary starred change.
pub const STAR_LABEL: &str = "star";

/// Star label marking a change the user asked never to hear about.
pub const IGNORE_LABEL: &str = "ignore";

/// Subjects at least this long are shortened for the mail subject line.
const MAX_SUBJECT_CHARS: usize = 73;

/// Characters kept from an over-long subject before the ellipsis.
const SHORT_SUBJECT_CHARS: usize = 69;

/// Star labels per account for one change.
pub type StarLabels = BTreeMap<AccountId, BTreeSet<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    #[default]
    New,
    Merged,
    Abandoned,
}

impl ChangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeStatus::New => "new",
            ChangeStatus::Merged => "merged",
            ChangeStatus::Abandoned => "abandoned",
        }
    }
}

/// Identity of the current patch set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSetInfo {
    pub number: u32,
    pub uploader: AccountId,
    /// Git author, when it maps to a registered account.
    #[serde(default)]
    pub author: Option<AccountId>,
    /// Git committer, when it maps to a registered account.
    #[serde(default)]
    pub committer: Option<AccountId>,
    #[serde(default)]
    pub commit_id: String,
}

/* --------------------------------------------------------------------------
ChangeSnapshot
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSnapshot {
    pub id: ChangeId,
    /// Stable change key carried in commit messages, e.g. `I8473b9...`.
    pub key: String,
    pub project: ProjectName,
    pub branch: String,
    pub subject: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub owner: AccountId,
    #[serde(default)]
    pub status: ChangeStatus,
    #[serde(default)]
    pub work_in_progress: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub review_started: bool,
    pub created_on: Timestamp,
    pub patch_set: PatchSetInfo,
    /// Accounts in the REVIEWER state.
    #[serde(default)]
    pub reviewers: BTreeSet<AccountId>,
    /// Accounts in the CC state.
    #[serde(default)]
    pub ccs: BTreeSet<AccountId>,
    #[serde(default)]
    pub reviewers_by_email: BTreeSet<Address>,
    #[serde(default)]
    pub ccs_by_email: BTreeSet<Address>,
    #[serde(default)]
    pub attention_set: BTreeSet<AccountId>,
    #[serde(default)]
    pub assignee: Option<AccountId>,
}

impl ChangeSnapshot {
    /// A fresh, open, reviewable change with a first patch set uploaded by
    /// `owner`.
    pub fn new(
        id: ChangeId,
        key: impl Into<String>,
        project: ProjectName,
        owner: AccountId,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            id,
            key: key.into(),
            project,
            branch: "refs/heads/master".to_string(),
            subject: subject.into(),
            topic: None,
            owner,
            status: ChangeStatus::New,
            work_in_progress: false,
            private: false,
            review_started: true,
            created_on: Utc::now(),
            patch_set: PatchSetInfo {
                number: 1,
                uploader: owner,
                author: Some(owner),
                committer: Some(owner),
                commit_id: String::new(),
            },
            reviewers: BTreeSet::new(),
            ccs: BTreeSet::new(),
            reviewers_by_email: BTreeSet::new(),
            ccs_by_email: BTreeSet::new(),
            attention_set: BTreeSet::new(),
            assignee: None,
        }
    }

    pub fn with_reviewer(mut self, account: AccountId) -> Self {
        self.ccs.remove(&account);
        self.reviewers.insert(account);
        self
    }

    pub fn with_cc(mut self, account: AccountId) -> Self {
        self.reviewers.remove(&account);
        self.ccs.insert(account);
        self
    }

    pub fn with_reviewer_by_email(mut self, address: Address) -> Self {
        self.reviewers_by_email.insert(address);
        self
    }

    pub fn with_cc_by_email(mut self, address: Address) -> Self {
        self.ccs_by_email.insert(address);
        self
    }

    /// Work in progress on which review has never started.
    pub fn work_in_progress(mut self) -> Self {
        self.work_in_progress = true;
        self.review_started = false;
        self
    }

    /// Work in progress that was already out for review once.
    pub fn reviewable_work_in_progress(mut self) -> Self {
        self.work_in_progress = true;
        self.review_started = true;
        self
    }

    /// REVIEWER and CC state accounts together.
    pub fn all_reviewers(&self) -> BTreeSet<AccountId> {
        self.reviewers.union(&self.ccs).copied().collect()
    }

    /// Reviewers and CCs that are plain addresses, not accounts.
    pub fn all_by_email(&self) -> BTreeSet<Address> {
        self.reviewers_by_email
            .union(&self.ccs_by_email)
            .cloned()
            .collect()
    }

    /// Owner followed by the uploader, author and committer of the current
    /// patch set, without repeats.
    pub fn authors(&self) -> Vec<AccountId> {
        let mut authors = vec![self.owner];
        let candidates = [
            Some(self.patch_set.uploader),
            self.patch_set.author,
            self.patch_set.committer,
        ];
        for account in candidates.into_iter().flatten() {
            if !authors.contains(&account) {
                authors.push(account);
            }
        }
        authors
    }

    pub fn is_author(&self, account: AccountId) -> bool {
        self.authors().contains(&account)
    }

    /// Subject line cut to a length suitable for mail subjects.
    pub fn short_subject(&self) -> String {
        if self.subject.chars().count() < MAX_SUBJECT_CHARS {
            return self.subject.clone();
        }
        let mut short: String = self.subject.chars().take(SHORT_SUBJECT_CHARS).collect();
        short.push_str("...");
        short
    }

    /// Branch name without the `refs/heads/` prefix.
    pub fn short_branch(&self) -> &str {
        self.branch
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.branch)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
