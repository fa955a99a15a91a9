//! Evaluation of watch and notify-config filters against a change.

use std::fmt;

use reviewmail_core::backend::{
    ChangePermissions, ChangePredicate, FilterParseError, FilterParser, QueryUser,
};
use reviewmail_core::change::ChangeSnapshot;
use reviewmail_core::types::{AccountId, ProjectName};

/// Where a filter came from, for log messages.
#[derive(Debug, Clone)]
pub enum FilterOrigin<'a> {
    AccountWatch {
        account: AccountId,
        project: &'a ProjectName,
    },
    NotifyConfig {
        project: &'a ProjectName,
        name: &'a str,
    },
}

impl fmt::Display for FilterOrigin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOrigin::AccountWatch { account, project } => {
                write!(f, "watch of account {account} on project {project}")
            }
            FilterOrigin::NotifyConfig { project, name } => {
                write!(f, "notify config {name} of project {project}")
            }
        }
    }
}

/// Change is readable by a user.
struct VisibleTo<'a> {
    permissions: &'a dyn ChangePermissions,
    user: QueryUser,
}

impl ChangePredicate for VisibleTo<'_> {
    fn matches(&self, change: &ChangeSnapshot) -> bool {
        self.permissions.can_read(&self.user, change)
    }
}

/// Conjunction; empty matches everything.
struct AllOf<'a>(Vec<Box<dyn ChangePredicate + 'a>>);

impl ChangePredicate for AllOf<'_> {
    fn matches(&self, change: &ChangeSnapshot) -> bool {
        self.0.iter().all(|p| p.matches(change))
    }
}

pub struct WatchFilter<'a> {
    parser: &'a dyn FilterParser,
    permissions: &'a dyn ChangePermissions,
}

impl<'a> WatchFilter<'a> {
    pub fn new(parser: &'a dyn FilterParser, permissions: &'a dyn ChangePermissions) -> Self {
        Self {
            parser,
            permissions,
        }
    }

    /// Match `change` against `filter` as seen by `user`.
    ///
    /// With a user, the change must also be readable by that user. With
    /// neither a user nor a filter, every change matches.
    pub fn try_matches(
        &self,
        user: Option<&QueryUser>,
        filter: Option<&str>,
        change: &ChangeSnapshot,
    ) -> Result<bool, FilterParseError> {
        let mut predicates: Vec<Box<dyn ChangePredicate + 'a>> = Vec::new();
        if let Some(user) = user {
            predicates.push(Box::new(VisibleTo {
                permissions: self.permissions,
                user: user.clone(),
            }));
        }
        if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
            predicates.push(self.parser.parse(filter, user)?);
        }
        Ok(AllOf(predicates).matches(change))
    }

    /// Like [`try_matches`](Self::try_matches), but an unparsable filter is
    /// logged and counts as not matching.
    pub fn matches(
        &self,
        origin: &FilterOrigin<'_>,
        user: Option<&QueryUser>,
        filter: Option<&str>,
        change: &ChangeSnapshot,
    ) -> bool {
        match self.try_matches(user, filter, change) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    origin = %origin,
                    change_id = %change.id,
                    "Invalid notification filter, treating as non-matching"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use reviewmail_core::types::ChangeId;
    use reviewmail_store::MemoryStore;

    use super::*;

    fn change(private: bool) -> ChangeSnapshot {
        let mut change = ChangeSnapshot::new(
            ChangeId(3),
            "I3",
            ProjectName::new("app"),
            AccountId(1),
            "subject",
        );
        change.private = private;
        change
    }

    #[test]
    fn no_user_and_no_filter_matches() {
        let store = MemoryStore::new();
        let filter = WatchFilter::new(&store, &store);
        assert_eq!(filter.try_matches(None, None, &change(true)), Ok(true));
    }

    #[test]
    fn user_must_see_the_change() {
        let store = MemoryStore::new();
        let filter = WatchFilter::new(&store, &store);
        let stranger = QueryUser::Account(AccountId(8));
        let owner = QueryUser::Account(AccountId(1));
        assert_eq!(filter.try_matches(Some(&stranger), None, &change(true)), Ok(false));
        assert_eq!(filter.try_matches(Some(&owner), None, &change(true)), Ok(true));
    }

    #[test]
    fn filter_is_anded_with_visibility() {
        let store = MemoryStore::new();
        let filter = WatchFilter::new(&store, &store);
        let user = QueryUser::Account(AccountId(8));
        assert_eq!(
            filter.try_matches(Some(&user), Some("branch:master"), &change(false)),
            Ok(true)
        );
        assert_eq!(
            filter.try_matches(Some(&user), Some("branch:stable"), &change(false)),
            Ok(false)
        );
    }

    #[test]
    fn parse_errors_do_not_match() {
        let store = MemoryStore::new();
        let filter = WatchFilter::new(&store, &store);
        let project = ProjectName::new("app");
        let origin = FilterOrigin::NotifyConfig {
            project: &project,
            name: "broken",
        };
        assert!(filter
            .try_matches(None, Some("label:Verified+1"), &change(false))
            .is_err());
        assert!(!filter.matches(&origin, None, Some("label:Verified+1"), &change(false)));
    }
}
