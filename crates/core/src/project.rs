//! Project configuration relevant to notification: hierarchy, state,
//! owners and notify-configs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::notify::{subscribes_to, NotifyType, RecipientType};
use crate::types::{GroupUuid, ProjectName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Active,
    ReadOnly,
    Hidden,
}

impl ProjectStatus {
    /// Hidden projects are unreadable to everyone, so nobody is mailed.
    pub fn permits_read(self) -> bool {
        !matches!(self, ProjectStatus::Hidden)
    }
}

/// A project-level mailing rule: mail groups and addresses for selected
/// notification types, optionally restricted by a change filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub name: String,
    #[serde(default)]
    pub types: BTreeSet<NotifyType>,
    #[serde(default = "default_header")]
    pub header: RecipientType,
    #[serde(default)]
    pub groups: Vec<GroupUuid>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_header() -> RecipientType {
    RecipientType::Bcc
}

impl NotifyConfig {
    pub fn new(name: impl Into<String>, types: impl IntoIterator<Item = NotifyType>) -> Self {
        Self {
            name: name.into(),
            types: types.into_iter().collect(),
            header: default_header(),
            groups: Vec::new(),
            addresses: Vec::new(),
            filter: None,
        }
    }

    pub fn with_header(mut self, header: RecipientType) -> Self {
        self.header = header;
        self
    }

    pub fn with_group(mut self, group: GroupUuid) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn is_notify(&self, notify_type: NotifyType) -> bool {
        subscribes_to(&self.types, notify_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectState {
    pub name: ProjectName,
    /// Parent project. `None` means All-Projects, except for All-Projects
    /// itself which has no parent.
    #[serde(default)]
    pub parent: Option<ProjectName>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub owner_groups: Vec<GroupUuid>,
    #[serde(default)]
    pub notify_configs: Vec<NotifyConfig>,
}

impl ProjectState {
    pub fn new(name: ProjectName) -> Self {
        Self {
            name,
            parent: None,
            status: ProjectStatus::Active,
            owner_groups: Vec::new(),
            notify_configs: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: ProjectName) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_owner_group(mut self, group: GroupUuid) -> Self {
        self.owner_groups.push(group);
        self
    }

    pub fn with_notify_config(mut self, config: NotifyConfig) -> Self {
        self.notify_configs.push(config);
        self
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }

    /// The parent to inherit from, with All-Projects as the implicit root.
    pub fn effective_parent(&self) -> Option<ProjectName> {
        if self.name.is_all_projects() {
            return None;
        }
        Some(self.parent.clone().unwrap_or_else(ProjectName::all_projects))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
