//! Flattening of nested groups into individual recipients.

use std::collections::{BTreeSet, HashSet};

use reviewmail_core::address::Address;
use reviewmail_core::backend::GroupBackend;
use reviewmail_core::group::GroupMembership;
use reviewmail_core::types::{AccountId, GroupUuid};

/// Recipients reachable from a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedGroup {
    pub accounts: BTreeSet<AccountId>,
    /// Mailing-list addresses of groups that were not traversed.
    pub emails: BTreeSet<Address>,
}

pub struct GroupExpander<'a> {
    backend: &'a dyn GroupBackend,
}

impl<'a> GroupExpander<'a> {
    pub fn new(backend: &'a dyn GroupBackend) -> Self {
        Self { backend }
    }

    /// Walk `start` and its subgroups, each group at most once.
    ///
    /// A group with a mailing-list address contributes that address and
    /// is not traversed further. External groups without an address and
    /// unknown groups contribute nothing.
    pub fn expand(&self, start: &GroupUuid) -> ExpandedGroup {
        let mut expanded = ExpandedGroup::default();
        let mut seen: HashSet<GroupUuid> = HashSet::from([start.clone()]);
        let mut stack = vec![start.clone()];

        while let Some(uuid) = stack.pop() {
            let Some(group) = self.backend.group(&uuid) else {
                tracing::debug!(group = %uuid, "Skipping unknown group");
                continue;
            };

            if let Some(email) = group.list_address() {
                expanded
                    .emails
                    .insert(Address::new(Some(group.name.clone()), email));
                continue;
            }

            match group.membership {
                GroupMembership::Internal { members, subgroups } => {
                    expanded.accounts.extend(members);
                    for subgroup in subgroups {
                        if seen.insert(subgroup.clone()) {
                            stack.push(subgroup);
                        }
                    }
                }
                GroupMembership::External => {
                    tracing::debug!(group = %uuid, "Cannot expand external group");
                }
            }
        }

        expanded
    }

    /// Whether `account` is reachable from any of `groups`.
    pub fn is_member(&self, account: AccountId, groups: &[GroupUuid]) -> bool {
        groups
            .iter()
            .any(|group| self.expand(group).accounts.contains(&account))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use reviewmail_core::group::GroupDescription;
    use reviewmail_store::MemoryStore;

    use super::*;

    fn uuid(name: &str) -> GroupUuid {
        GroupUuid::new(name)
    }

    #[test]
    fn cyclic_groups_terminate_with_union_of_members() {
        let mut store = MemoryStore::new();
        store
            .insert_group(GroupDescription::internal(
                uuid("a"),
                "A",
                [AccountId(1)],
                [uuid("b")],
            ))
            .insert_group(GroupDescription::internal(
                uuid("b"),
                "B",
                [AccountId(2)],
                [uuid("a")],
            ));

        let expanded = GroupExpander::new(&store).expand(&uuid("a"));
        assert_eq!(
            expanded.accounts,
            [AccountId(1), AccountId(2)].into_iter().collect()
        );
        assert!(expanded.emails.is_empty());
    }

    #[test]
    fn mailing_list_stops_traversal() {
        let mut store = MemoryStore::new();
        store
            .insert_group(GroupDescription::internal(
                uuid("outer"),
                "Outer",
                [AccountId(1)],
                [uuid("list")],
            ))
            .insert_group(
                GroupDescription::internal(uuid("list"), "List", [AccountId(9)], [uuid("deep")])
                    .with_email("list@example.com"),
            )
            .insert_group(GroupDescription::internal(
                uuid("deep"),
                "Deep",
                [AccountId(10)],
                [],
            ));

        let expanded = GroupExpander::new(&store).expand(&uuid("outer"));
        assert_eq!(expanded.accounts, [AccountId(1)].into_iter().collect());
        assert!(expanded
            .emails
            .contains(&Address::email_only("list@example.com")));
    }

    #[test]
    fn external_and_unknown_groups_are_skipped() {
        let mut store = MemoryStore::new();
        store
            .insert_group(GroupDescription::internal(
                uuid("top"),
                "Top",
                [],
                [uuid("ldap"), uuid("missing")],
            ))
            .insert_group(GroupDescription::external(uuid("ldap"), "LDAP"));

        let expander = GroupExpander::new(&store);
        assert_eq!(expander.expand(&uuid("top")), ExpandedGroup::default());
        assert!(!expander.is_member(AccountId(1), &[uuid("top")]));
    }
}
