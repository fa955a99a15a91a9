//! Notify scopes, notification types and recipient buckets.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::AccountId;

/* --------------------------------------------------------------------------
NotifyHandling
-------------------------------------------------------------------------- */

/// How widely an action's notification fans out.
///
/// Scopes are totally ordered `NONE < OWNER < OWNER_REVIEWERS < ALL`; every
/// recipient category has a minimum scope and is only consulted when the
/// requested scope reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotifyHandling {
    None,
    Owner,
    OwnerReviewers,
    #[default]
    All,
}

impl NotifyHandling {
    pub fn rank(self) -> u8 {
        match self {
            NotifyHandling::None => 0,
            NotifyHandling::Owner => 1,
            NotifyHandling::OwnerReviewers => 2,
            NotifyHandling::All => 3,
        }
    }

    /// Whether a recipient category gated at `minimum` is included.
    pub fn allows(self, minimum: NotifyHandling) -> bool {
        self.rank() >= minimum.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NotifyHandling::None => "NONE",
            NotifyHandling::Owner => "OWNER",
            NotifyHandling::OwnerReviewers => "OWNER_REVIEWERS",
            NotifyHandling::All => "ALL",
        }
    }
}

impl fmt::Display for NotifyHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotifyHandling {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(NotifyHandling::None),
            "OWNER" => Ok(NotifyHandling::Owner),
            "OWNER_REVIEWERS" => Ok(NotifyHandling::OwnerReviewers),
            "ALL" => Ok(NotifyHandling::All),
            other => Err(CoreError::Validation(format!(
                "Invalid notify handling '{other}'. Must be one of: NONE, OWNER, OWNER_REVIEWERS, ALL"
            ))),
        }
    }
}

/* --------------------------------------------------------------------------
NotifyType
-------------------------------------------------------------------------- */

/// Category of event a watch or notify-config subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotifyType {
    NewChanges,
    NewPatchsets,
    AllComments,
    SubmittedChanges,
    AbandonedChanges,
    ReviewStartedChanges,
    /// Subscribes to every other type.
    All,
}

impl NotifyType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotifyType::NewChanges => "NEW_CHANGES",
            NotifyType::NewPatchsets => "NEW_PATCHSETS",
            NotifyType::AllComments => "ALL_COMMENTS",
            NotifyType::SubmittedChanges => "SUBMITTED_CHANGES",
            NotifyType::AbandonedChanges => "ABANDONED_CHANGES",
            NotifyType::ReviewStartedChanges => "REVIEW_STARTED_CHANGES",
            NotifyType::All => "ALL",
        }
    }
}

/// True when a subscription set covers `wanted`.
pub fn subscribes_to(types: &BTreeSet<NotifyType>, wanted: NotifyType) -> bool {
    types.contains(&wanted) || types.contains(&NotifyType::All)
}

impl fmt::Display for NotifyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
RecipientType
-------------------------------------------------------------------------- */

/// Header bucket a recipient is delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipientType {
    To,
    Cc,
    Bcc,
}

impl RecipientType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecipientType::To => "TO",
            RecipientType::Cc => "CC",
            RecipientType::Bcc => "BCC",
        }
    }
}

/* --------------------------------------------------------------------------
ExplicitRecipients
-------------------------------------------------------------------------- */

/// Accounts named by the caller of an action, per bucket.
///
/// They receive the message at any notify scope, including `NONE`, and the
/// acting user is never stripped when named here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExplicitRecipients(BTreeMap<RecipientType, BTreeSet<AccountId>>);

impl ExplicitRecipients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, bucket: RecipientType, account: AccountId) -> Self {
        self.0.entry(bucket).or_default().insert(account);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeSet::is_empty)
    }

    pub fn contains(&self, account: AccountId) -> bool {
        self.0.values().any(|accounts| accounts.contains(&account))
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecipientType, AccountId)> + '_ {
        self.0
            .iter()
            .flat_map(|(bucket, accounts)| accounts.iter().map(move |a| (*bucket, *a)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
