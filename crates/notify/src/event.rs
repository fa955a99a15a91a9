//! Change events that trigger notification.
//!
//! A [`ChangeEvent`] carries the post-action snapshot of the change, the
//! acting account and the caller's notify request, plus event specific
//! details in [`ChangeEventKind`].

use chrono::Utc;
use reviewmail_core::address::Address;
use reviewmail_core::change::ChangeSnapshot;
use reviewmail_core::notify::{ExplicitRecipients, NotifyHandling};
use reviewmail_core::types::{AccountId, Timestamp};
use serde::{Deserialize, Serialize};

/// Message tags starting with this prefix mark automated comments.
pub const AUTOGENERATED_TAG_PREFIX: &str = "autogenerated:";

/// A reviewer taken off a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovedReviewer {
    Account(AccountId),
    Address(Address),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEventKind {
    NewChange,
    NewPatchSet {
        /// Reviewers added together with the upload.
        #[serde(default)]
        added_reviewers: Vec<AccountId>,
        #[serde(default)]
        added_ccs: Vec<AccountId>,
    },
    Comment {
        #[serde(default)]
        tag: Option<String>,
    },
    Abandoned,
    Restored,
    Merged,
    ReviewerAdded {
        #[serde(default)]
        reviewers: Vec<AccountId>,
        /// Reviewers without an account.
        #[serde(default)]
        addresses: Vec<Address>,
    },
    ReviewerDeleted {
        reviewer: RemovedReviewer,
        /// Whether the removed reviewer had voted on the change.
        #[serde(default)]
        had_votes: bool,
    },
    VoteDeleted {
        reviewer: AccountId,
        label: String,
    },
    AssigneeChanged {
        #[serde(default)]
        previous: Option<AccountId>,
        assignee: AccountId,
    },
    /// The change was reverted by the new change `revert`.
    Reverted {
        revert: Box<ChangeSnapshot>,
    },
}

impl ChangeEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChangeEventKind::NewChange => "new_change",
            ChangeEventKind::NewPatchSet { .. } => "new_patch_set",
            ChangeEventKind::Comment { .. } => "comment",
            ChangeEventKind::Abandoned => "abandoned",
            ChangeEventKind::Restored => "restored",
            ChangeEventKind::Merged => "merged",
            ChangeEventKind::ReviewerAdded { .. } => "reviewer_added",
            ChangeEventKind::ReviewerDeleted { .. } => "reviewer_deleted",
            ChangeEventKind::VoteDeleted { .. } => "vote_deleted",
            ChangeEventKind::AssigneeChanged { .. } => "assignee_changed",
            ChangeEventKind::Reverted { .. } => "reverted",
        }
    }

    /// Comment posted by automation rather than a person.
    pub fn is_autogenerated(&self) -> bool {
        matches!(
            self,
            ChangeEventKind::Comment { tag: Some(tag) } if tag.starts_with(AUTOGENERATED_TAG_PREFIX)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeEventKind,
    /// State of the change after the action.
    pub change: ChangeSnapshot,
    #[serde(default)]
    pub actor: Option<AccountId>,
    /// Scope override; the event kind's default applies when absent.
    #[serde(default)]
    pub notify: Option<NotifyHandling>,
    #[serde(default)]
    pub notify_accounts: ExplicitRecipients,
    /// Comment text, cover letter or abandon reason.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: Timestamp,
}

impl ChangeEvent {
    pub fn new(kind: ChangeEventKind, change: ChangeSnapshot) -> Self {
        Self {
            kind,
            change,
            actor: None,
            notify: None,
            notify_accounts: ExplicitRecipients::new(),
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn by(mut self, actor: AccountId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_notify(mut self, handling: NotifyHandling) -> Self {
        self.notify = Some(handling);
        self
    }

    pub fn with_notify_accounts(mut self, accounts: ExplicitRecipients) -> Self {
        self.notify_accounts = accounts;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
