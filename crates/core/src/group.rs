//! Group descriptions as returned by a group backend.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, GroupUuid};

/// Membership of a group. Only internal groups can be enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupMembership {
    Internal {
        #[serde(default)]
        members: Vec<AccountId>,
        #[serde(default)]
        subgroups: Vec<GroupUuid>,
    },
    /// Backed by an external system (LDAP, SSO...). Members are unknown.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDescription {
    pub uuid: GroupUuid,
    pub name: String,
    /// Mailing list address. When present, mail goes to the list instead
    /// of the individual members.
    #[serde(default)]
    pub email_address: Option<String>,
    pub membership: GroupMembership,
}

impl GroupDescription {
    pub fn internal(
        uuid: GroupUuid,
        name: impl Into<String>,
        members: impl IntoIterator<Item = AccountId>,
        subgroups: impl IntoIterator<Item = GroupUuid>,
    ) -> Self {
        Self {
            uuid,
            name: name.into(),
            email_address: None,
            membership: GroupMembership::Internal {
                members: members.into_iter().collect(),
                subgroups: subgroups.into_iter().collect(),
            },
        }
    }

    pub fn external(uuid: GroupUuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            email_address: None,
            membership: GroupMembership::External,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email_address = Some(email.into());
        self
    }

    /// The mailing list address, ignoring blank values.
    pub fn list_address(&self) -> Option<&str> {
        self.email_address
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}
