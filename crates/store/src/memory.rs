use std::collections::{BTreeMap, BTreeSet};

use reviewmail_core::account::{AccountState, ProjectWatch};
use reviewmail_core::backend::{
    AccountDirectory, ChangePermissions, ChangePredicate, FilterParseError, FilterParser,
    GroupBackend, ProjectDirectory, QueryUser, StarredChanges,
};
use reviewmail_core::change::{ChangeSnapshot, StarLabels};
use reviewmail_core::error::CoreError;
use reviewmail_core::group::GroupDescription;
use reviewmail_core::project::ProjectState;
use reviewmail_core::types::{AccountId, ChangeId, GroupUuid, ProjectName};

use crate::terms::TermFilterParser;

/// Site data held in memory.
///
/// Visibility rules: hidden projects are unreadable; private changes are
/// readable only by their owner, reviewers, CCs and assignee; everything
/// else is public.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    accounts: BTreeMap<AccountId, AccountState>,
    watches: BTreeMap<AccountId, Vec<ProjectWatch>>,
    groups: BTreeMap<GroupUuid, GroupDescription>,
    projects: BTreeMap<ProjectName, ProjectState>,
    stars: BTreeMap<ChangeId, StarLabels>,
    cannot_email_reviewers: BTreeSet<AccountId>,
    unavailable_stars: BTreeSet<ChangeId>,
    filters: TermFilterParser,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&mut self, account: AccountState) -> &mut Self {
        self.accounts.insert(account.id, account);
        self
    }

    pub fn insert_watch(&mut self, account: AccountId, watch: ProjectWatch) -> &mut Self {
        self.watches.entry(account).or_default().push(watch);
        self
    }

    pub fn insert_group(&mut self, group: GroupDescription) -> &mut Self {
        self.groups.insert(group.uuid.clone(), group);
        self
    }

    pub fn insert_project(&mut self, project: ProjectState) -> &mut Self {
        self.projects.insert(project.name.clone(), project);
        self
    }

    /// Attach a star label (`star`, `ignore`, ...) from `account` to `change`.
    pub fn star(&mut self, change: ChangeId, account: AccountId, label: &str) -> &mut Self {
        self.stars
            .entry(change)
            .or_default()
            .entry(account)
            .or_default()
            .insert(label.to_string());
        self
    }

    /// Revoke the capability to mail reviewers and watchers from `account`.
    pub fn deny_email_reviewers(&mut self, account: AccountId) -> &mut Self {
        self.cannot_email_reviewers.insert(account);
        self
    }

    /// Make star lookups for `change` fail, as a broken backend would.
    pub fn break_stars(&mut self, change: ChangeId) -> &mut Self {
        self.unavailable_stars.insert(change);
        self
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

impl AccountDirectory for MemoryStore {
    fn account(&self, id: AccountId) -> Option<AccountState> {
        self.accounts.get(&id).cloned()
    }

    fn accounts_watching(&self, project: &ProjectName) -> Vec<AccountId> {
        self.watches
            .iter()
            .filter(|(_, watches)| watches.iter().any(|w| &w.project == project))
            .map(|(id, _)| *id)
            .collect()
    }

    fn project_watches(&self, id: AccountId) -> Vec<ProjectWatch> {
        self.watches.get(&id).cloned().unwrap_or_default()
    }
}

impl GroupBackend for MemoryStore {
    fn group(&self, uuid: &GroupUuid) -> Option<GroupDescription> {
        self.groups.get(uuid).cloned()
    }
}

impl ProjectDirectory for MemoryStore {
    fn project(&self, name: &ProjectName) -> Option<ProjectState> {
        self.projects.get(name).cloned()
    }
}

impl StarredChanges for MemoryStore {
    fn stars(&self, change: ChangeId) -> Result<StarLabels, CoreError> {
        if self.unavailable_stars.contains(&change) {
            return Err(CoreError::Internal(format!(
                "star labels for change {change} are unavailable"
            )));
        }
        Ok(self.stars.get(&change).cloned().unwrap_or_default())
    }
}

impl ChangePermissions for MemoryStore {
    fn can_read(&self, user: &QueryUser, change: &ChangeSnapshot) -> bool {
        let project_readable = self
            .projects
            .get(&change.project)
            .map_or(true, |p| p.status.permits_read());
        if !project_readable {
            return false;
        }
        if !change.private {
            return true;
        }
        match user {
            QueryUser::Account(id) => {
                change.owner == *id
                    || change.reviewers.contains(id)
                    || change.ccs.contains(id)
                    || change.assignee == Some(*id)
            }
            QueryUser::Group(_) | QueryUser::Anonymous => false,
        }
    }

    fn can_email_reviewers(&self, actor: AccountId, _change: &ChangeSnapshot) -> bool {
        !self.cannot_email_reviewers.contains(&actor)
    }
}

impl FilterParser for MemoryStore {
    fn parse(
        &self,
        query: &str,
        user: Option<&QueryUser>,
    ) -> Result<Box<dyn ChangePredicate>, FilterParseError> {
        self.filters.parse(query, user)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
