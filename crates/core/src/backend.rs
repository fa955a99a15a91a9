//! Read-only lookups the notification engine consumes.
//!
//! Implementations live outside the engine (a database layer, or the
//! in-memory store used by the worker and tests). All lookups are
//! synchronous and cheap; the engine calls them many times per message.

use std::fmt;

use crate::account::{AccountState, ProjectWatch};
use crate::change::{ChangeSnapshot, StarLabels};
use crate::error::CoreError;
use crate::group::GroupDescription;
use crate::project::ProjectState;
use crate::types::{AccountId, ChangeId, GroupUuid, ProjectName};

/// Identity a visibility check or filter is evaluated as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryUser {
    /// Nobody in particular; sees only what anonymous users can read.
    Anonymous,
    Account(AccountId),
    /// Synthetic user whose only membership is one group.
    Group(GroupUuid),
}

impl fmt::Display for QueryUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryUser::Anonymous => f.write_str("anonymous"),
            QueryUser::Account(id) => write!(f, "account {id}"),
            QueryUser::Group(uuid) => write!(f, "group {uuid}"),
        }
    }
}

pub trait AccountDirectory: Send + Sync {
    fn account(&self, id: AccountId) -> Option<AccountState>;

    /// Accounts with at least one watch row naming `project` exactly.
    fn accounts_watching(&self, project: &ProjectName) -> Vec<AccountId>;

    fn project_watches(&self, id: AccountId) -> Vec<ProjectWatch>;
}

pub trait GroupBackend: Send + Sync {
    fn group(&self, uuid: &GroupUuid) -> Option<GroupDescription>;
}

pub trait ProjectDirectory: Send + Sync {
    fn project(&self, name: &ProjectName) -> Option<ProjectState>;
}

pub trait StarredChanges: Send + Sync {
    /// Star labels per account. Failure here aborts the notification.
    fn stars(&self, change: ChangeId) -> Result<StarLabels, CoreError>;
}

pub trait ChangePermissions: Send + Sync {
    fn can_read(&self, user: &QueryUser, change: &ChangeSnapshot) -> bool;

    /// Whether `actor` may cause mail to reach reviewers and watchers.
    /// Actors without it can only notify the change's authors.
    fn can_email_reviewers(&self, _actor: AccountId, _change: &ChangeSnapshot) -> bool {
        true
    }
}

/// A compiled change filter.
pub trait ChangePredicate: Send + Sync {
    fn matches(&self, change: &ChangeSnapshot) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid filter '{query}': {reason}")]
pub struct FilterParseError {
    pub query: String,
    pub reason: String,
}

pub trait FilterParser: Send + Sync {
    /// Compile `query`, evaluated on behalf of `user` when one is given.
    fn parse(
        &self,
        query: &str,
        user: Option<&QueryUser>,
    ) -> Result<Box<dyn ChangePredicate>, FilterParseError>;
}
