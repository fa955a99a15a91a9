//! Account state and per-account email preferences.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::notify::{subscribes_to, NotifyType};
use crate::types::{AccountId, ProjectName};

/// Whether and how an account receives notification mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailStrategy {
    #[default]
    Enabled,
    /// Also receive a CC copy of mail caused by one's own actions.
    CcOnOwnComments,
    /// Only mail for changes where the account is in the attention set.
    AttentionSetOnly,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailFormat {
    Plaintext,
    #[default]
    HtmlPlaintext,
}

/// Snapshot of an account as the notification engine sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    pub id: AccountId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub preferred_email: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub email_strategy: EmailStrategy,
    #[serde(default)]
    pub email_format: EmailFormat,
}

fn default_active() -> bool {
    true
}

impl AccountState {
    pub fn new(id: AccountId, full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            full_name: Some(full_name.into()),
            username: None,
            preferred_email: Some(email.into()),
            active: true,
            email_strategy: EmailStrategy::default(),
            email_format: EmailFormat::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: EmailStrategy) -> Self {
        self.email_strategy = strategy;
        self
    }

    pub fn with_format(mut self, format: EmailFormat) -> Self {
        self.email_format = format;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Deliverable address, or `None` for inactive accounts and accounts
    /// without a preferred email.
    pub fn address(&self) -> Option<Address> {
        if !self.active {
            return None;
        }
        self.preferred_email
            .as_deref()
            .filter(|email| !email.trim().is_empty())
            .map(|email| Address::new(self.full_name.clone(), email))
    }

    /// Human readable name used in headers and footers.
    pub fn display_name(&self) -> String {
        self.full_name
            .clone()
            .or_else(|| self.username.clone())
            .or_else(|| self.preferred_email.clone())
            .unwrap_or_else(|| format!("Account {}", self.id))
    }
}

/// One row of an account's watch configuration: a project, an optional
/// change filter and the notification types it subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWatch {
    pub project: ProjectName,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub notify: BTreeSet<NotifyType>,
}

impl ProjectWatch {
    pub fn new(project: ProjectName, notify: impl IntoIterator<Item = NotifyType>) -> Self {
        Self {
            project,
            filter: None,
            notify: notify.into_iter().collect(),
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn is_notify(&self, notify_type: NotifyType) -> bool {
        subscribes_to(&self.notify, notify_type)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_account_has_no_address() {
        let account = AccountState::new(AccountId(5), "Gone", "gone@example.com").inactive();
        assert!(account.address().is_none());
    }

    #[test]
    fn account_without_email_has_no_address() {
        let mut account = AccountState::new(AccountId(6), "Nomail", "");
        assert!(account.address().is_none());
        account.preferred_email = None;
        assert!(account.address().is_none());
        assert_eq!(account.display_name(), "Nomail");
    }

    #[test]
    fn deserializes_with_defaults() {
        let account: AccountState =
            serde_json::from_str(r#"{"id": 3, "preferred_email": "a@example.com"}"#)
                .expect("valid account json");
        assert!(account.active);
        assert_eq!(account.email_strategy, EmailStrategy::Enabled);
        assert_eq!(account.email_format, EmailFormat::HtmlPlaintext);
        assert_eq!(account.display_name(), "a@example.com");
    }
}
