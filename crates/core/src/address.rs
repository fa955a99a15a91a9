//! Email addresses of recipients who may or may not hold an account.
//!
//! Two [`Address`]es are the same recipient when their emails match
//! ignoring ASCII case. The display name never takes part in equality,
//! hashing or ordering.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::error::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

impl Address {
    pub fn new(name: Option<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.filter(|n| !n.trim().is_empty()),
            email: email.into(),
        }
    }

    /// Address without a display name.
    pub fn email_only(email: impl Into<String>) -> Self {
        Self::new(None, email)
    }

    /// True when the email part is syntactically deliverable.
    pub fn is_valid(&self) -> bool {
        is_valid_email(&self.email)
    }

    /// Domain part of the email, lowercased.
    pub fn domain(&self) -> Option<String> {
        self.email
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_ascii_lowercase())
    }

    fn key(&self) -> String {
        self.email.to_ascii_lowercase()
    }
}

/// Syntax check used before an address is admitted to a recipient list.
pub fn is_valid_email(email: &str) -> bool {
    !email.trim().is_empty() && email.validate_email()
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.email.eq_ignore_ascii_case(&other.email)
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

impl FromStr for Address {
    type Err = CoreError;

    /// Accepts `user@example.com` or `Display Name <user@example.com>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let address = match (s.rfind('<'), s.ends_with('>')) {
            (Some(open), true) => {
                let name = s[..open].trim().trim_matches('"').to_string();
                Address::new(Some(name), s[open + 1..s.len() - 1].trim())
            }
            _ => Address::email_only(s),
        };

        if address.is_valid() {
            Ok(address)
        } else {
            Err(CoreError::Validation(format!("Invalid email address '{s}'")))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
