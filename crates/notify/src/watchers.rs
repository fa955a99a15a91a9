//! Implicit recipients: account watches and project notify-configs.

use std::collections::{BTreeSet, HashSet};

use reviewmail_core::account::ProjectWatch;
use reviewmail_core::address::Address;
use reviewmail_core::backend::{AccountDirectory, GroupBackend, ProjectDirectory, QueryUser};
use reviewmail_core::change::ChangeSnapshot;
use reviewmail_core::notify::{NotifyType, RecipientType};
use reviewmail_core::project::{NotifyConfig, ProjectState};
use reviewmail_core::types::{AccountId, ProjectName};

use crate::filter::{FilterOrigin, WatchFilter};
use crate::groups::GroupExpander;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherList {
    pub accounts: BTreeSet<AccountId>,
    pub emails: BTreeSet<Address>,
}

impl WatcherList {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.emails.is_empty()
    }

    fn extend(&mut self, other: WatcherList) {
        self.accounts.extend(other.accounts);
        self.emails.extend(other.emails);
    }
}

/// Watchers of a change, per bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watchers {
    pub to: WatcherList,
    pub cc: WatcherList,
    pub bcc: WatcherList,
}

impl Watchers {
    pub fn list_mut(&mut self, bucket: RecipientType) -> &mut WatcherList {
        match bucket {
            RecipientType::To => &mut self.to,
            RecipientType::Cc => &mut self.cc,
            RecipientType::Bcc => &mut self.bcc,
        }
    }

    pub fn lists(&self) -> [(RecipientType, &WatcherList); 3] {
        [
            (RecipientType::To, &self.to),
            (RecipientType::Cc, &self.cc),
            (RecipientType::Bcc, &self.bcc),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty()
    }

    /// Every watcher account regardless of bucket.
    pub fn all_accounts(&self) -> BTreeSet<AccountId> {
        self.lists()
            .iter()
            .flat_map(|(_, list)| list.accounts.iter().copied())
            .collect()
    }

    pub fn merge(&mut self, other: Watchers) {
        self.to.extend(other.to);
        self.cc.extend(other.cc);
        self.bcc.extend(other.bcc);
    }
}

pub struct ProjectWatchResolver<'a> {
    accounts: &'a dyn AccountDirectory,
    groups: &'a dyn GroupBackend,
    projects: &'a dyn ProjectDirectory,
    filter: WatchFilter<'a>,
}

impl<'a> ProjectWatchResolver<'a> {
    pub fn new(
        accounts: &'a dyn AccountDirectory,
        groups: &'a dyn GroupBackend,
        projects: &'a dyn ProjectDirectory,
        filter: WatchFilter<'a>,
    ) -> Self {
        Self {
            accounts,
            groups,
            projects,
            filter,
        }
    }

    /// Watchers of `change` for one notification type.
    ///
    /// An account whose watch on the change's own project matches the
    /// change is settled by that watch: its All-Projects watch is not
    /// consulted, even when the project watch omits `notify_type`.
    pub fn resolve(
        &self,
        notify_type: NotifyType,
        change: &ChangeSnapshot,
        include_notify_configs: bool,
    ) -> Watchers {
        let mut watchers = Watchers::default();
        let mut touched: HashSet<AccountId> = HashSet::new();

        for account in self.accounts.accounts_watching(&change.project) {
            for watch in self.watches_on(account, &change.project) {
                if self.add_account_watch(&mut watchers, account, &watch, notify_type, change) {
                    touched.insert(account);
                }
            }
        }

        let all_projects = ProjectName::all_projects();
        for account in self.accounts.accounts_watching(&all_projects) {
            if touched.contains(&account) {
                continue;
            }
            for watch in self.watches_on(account, &all_projects) {
                self.add_account_watch(&mut watchers, account, &watch, notify_type, change);
            }
        }

        if include_notify_configs {
            for project in self.project_chain(&change.project) {
                for config in project.notify_configs.iter().filter(|c| c.is_notify(notify_type)) {
                    self.add_notify_config(&mut watchers, &project.name, config, change);
                }
            }
        }

        watchers
    }

    /// Union of [`resolve`](Self::resolve) over several types.
    pub fn resolve_all(
        &self,
        notify_types: &[NotifyType],
        change: &ChangeSnapshot,
        include_notify_configs: bool,
    ) -> Watchers {
        let mut watchers = Watchers::default();
        for notify_type in notify_types {
            watchers.merge(self.resolve(*notify_type, change, include_notify_configs));
        }
        watchers
    }

    /// Whether `account` belongs to an owner group of the change's project
    /// or any of its ancestors.
    pub fn is_project_owner(&self, account: AccountId, change: &ChangeSnapshot) -> bool {
        let expander = GroupExpander::new(self.groups);
        self.project_chain(&change.project)
            .iter()
            .any(|project| expander.is_member(account, &project.owner_groups))
    }

    /// The project followed by its ancestors, All-Projects last.
    pub fn project_chain(&self, start: &ProjectName) -> Vec<ProjectState> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(start.clone());

        while let Some(name) = next.take() {
            if !seen.insert(name.clone()) {
                tracing::warn!(project = %name, "Cycle in project hierarchy");
                break;
            }
            match self.projects.project(&name) {
                Some(project) => {
                    next = project.effective_parent();
                    chain.push(project);
                }
                None if !name.is_all_projects() => {
                    tracing::debug!(project = %name, "Unknown project, continuing at root");
                    next = Some(ProjectName::all_projects());
                }
                None => {}
            }
        }

        chain
    }

    fn watches_on(&self, account: AccountId, project: &ProjectName) -> Vec<ProjectWatch> {
        self.accounts
            .project_watches(account)
            .into_iter()
            .filter(|watch| &watch.project == project)
            .collect()
    }

    /// Returns whether the watch's filter matched.
    fn add_account_watch(
        &self,
        watchers: &mut Watchers,
        account: AccountId,
        watch: &ProjectWatch,
        notify_type: NotifyType,
        change: &ChangeSnapshot,
    ) -> bool {
        let origin = FilterOrigin::AccountWatch {
            account,
            project: &watch.project,
        };
        let user = QueryUser::Account(account);
        if !self
            .filter
            .matches(&origin, Some(&user), watch.filter.as_deref(), change)
        {
            return false;
        }
        if watch.is_notify(notify_type) {
            watchers.bcc.accounts.insert(account);
        }
        true
    }

    fn add_notify_config(
        &self,
        watchers: &mut Watchers,
        project: &ProjectName,
        config: &NotifyConfig,
        change: &ChangeSnapshot,
    ) {
        let origin = FilterOrigin::NotifyConfig {
            project,
            name: &config.name,
        };
        let expander = GroupExpander::new(self.groups);
        let list = watchers.list_mut(config.header);

        for group in &config.groups {
            let user = QueryUser::Group(group.clone());
            if self
                .filter
                .matches(&origin, Some(&user), config.filter.as_deref(), change)
            {
                let expanded = expander.expand(group);
                list.accounts.extend(expanded.accounts);
                list.emails.extend(expanded.emails);
            }
        }

        if !config.addresses.is_empty()
            && self
                .filter
                .matches(&origin, None, config.filter.as_deref(), change)
        {
            list.emails.extend(config.addresses.iter().cloned());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use reviewmail_core::account::AccountState;
    use reviewmail_core::group::GroupDescription;
    use reviewmail_core::types::{ChangeId, GroupUuid};
    use reviewmail_store::MemoryStore;

    use super::*;

    fn change() -> ChangeSnapshot {
        ChangeSnapshot::new(
            ChangeId(11),
            "I11",
            ProjectName::new("app"),
            AccountId(1),
            "subject",
        )
    }

    fn resolve(store: &MemoryStore, notify_type: NotifyType, configs: bool) -> Watchers {
        let resolver = ProjectWatchResolver::new(store, store, store, WatchFilter::new(store, store));
        resolver.resolve(notify_type, &change(), configs)
    }

    #[test]
    fn project_watch_suppresses_wildcard_watch() {
        let mut store = MemoryStore::new();
        store
            .insert_account(AccountState::new(AccountId(5), "W", "w@example.com"))
            .insert_watch(
                AccountId(5),
                ProjectWatch::new(ProjectName::new("app"), [NotifyType::NewChanges]),
            )
            .insert_watch(
                AccountId(5),
                ProjectWatch::new(ProjectName::all_projects(), [NotifyType::AllComments]),
            );

        assert!(resolve(&store, NotifyType::AllComments, false).is_empty());
        assert!(resolve(&store, NotifyType::NewChanges, false)
            .bcc
            .accounts
            .contains(&AccountId(5)));
    }

    #[test]
    fn non_matching_project_filter_falls_back_to_wildcard() {
        let mut store = MemoryStore::new();
        store
            .insert_watch(
                AccountId(5),
                ProjectWatch::new(ProjectName::new("app"), [NotifyType::NewChanges])
                    .with_filter("branch:stable"),
            )
            .insert_watch(
                AccountId(5),
                ProjectWatch::new(ProjectName::all_projects(), [NotifyType::AllComments]),
            );

        let watchers = resolve(&store, NotifyType::AllComments, false);
        assert_eq!(watchers.bcc.accounts, [AccountId(5)].into_iter().collect());
    }

    #[test]
    fn notify_configs_are_inherited_root_last() {
        let team = GroupUuid::new("team");
        let mut store = MemoryStore::new();
        store
            .insert_group(GroupDescription::internal(team.clone(), "Team", [AccountId(7)], []))
            .insert_project(
                ProjectState::new(ProjectName::new("app"))
                    .with_parent(ProjectName::new("parent"))
                    .with_notify_config(
                        NotifyConfig::new("team", [NotifyType::AllComments])
                            .with_header(RecipientType::Cc)
                            .with_group(team.clone()),
                    ),
            )
            .insert_project(ProjectState::new(ProjectName::new("parent")).with_notify_config(
                NotifyConfig::new("list", [NotifyType::All])
                    .with_address(Address::email_only("dev@example.com"))
                    .with_filter("branch:master"),
            ))
            .insert_project(ProjectState::new(ProjectName::all_projects()));

        let watchers = resolve(&store, NotifyType::AllComments, true);
        assert_eq!(watchers.cc.accounts, [AccountId(7)].into_iter().collect());
        assert!(watchers
            .bcc
            .emails
            .contains(&Address::email_only("dev@example.com")));

        assert!(resolve(&store, NotifyType::AllComments, false).is_empty());

        let resolver =
            ProjectWatchResolver::new(&store, &store, &store, WatchFilter::new(&store, &store));
        let chain: Vec<_> = resolver
            .project_chain(&ProjectName::new("app"))
            .into_iter()
            .map(|p| p.name.to_string())
            .collect();
        assert_eq!(chain, vec!["app", "parent", "All-Projects"]);
    }

    #[test]
    fn invalid_config_filter_is_skipped_not_fatal() {
        let mut store = MemoryStore::new();
        store.insert_project(
            ProjectState::new(ProjectName::new("app"))
                .with_notify_config(
                    NotifyConfig::new("broken", [NotifyType::AllComments])
                        .with_address(Address::email_only("broken@example.com"))
                        .with_filter("label:Code-Review+2"),
                )
                .with_notify_config(
                    NotifyConfig::new("ok", [NotifyType::AllComments])
                        .with_address(Address::email_only("ok@example.com")),
                ),
        );

        let watchers = resolve(&store, NotifyType::AllComments, true);
        assert_eq!(
            watchers.bcc.emails,
            [Address::email_only("ok@example.com")].into_iter().collect()
        );
    }

    #[test]
    fn project_owners_are_found_through_the_hierarchy() {
        let admins = GroupUuid::new("admins");
        let mut store = MemoryStore::new();
        store
            .insert_group(GroupDescription::internal(admins.clone(), "Admins", [AccountId(3)], []))
            .insert_project(ProjectState::new(ProjectName::new("app")))
            .insert_project(ProjectState::new(ProjectName::all_projects()).with_owner_group(admins));

        let resolver =
            ProjectWatchResolver::new(&store, &store, &store, WatchFilter::new(&store, &store));
        assert!(resolver.is_project_owner(AccountId(3), &change()));
        assert!(!resolver.is_project_owner(AccountId(4), &change()));
    }
}
