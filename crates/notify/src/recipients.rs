//! TO/CC/BCC accumulator for one outgoing message.
//!
//! The first bucket a recipient lands in wins: later additions of the same
//! account id, or of any address with the same email, are no-ops. Who may
//! be added at all is decided by an [`Admission`] policy supplied by the
//! caller.

use std::collections::BTreeSet;

use reviewmail_core::account::{AccountState, EmailFormat, EmailStrategy};
use reviewmail_core::address::Address;
use reviewmail_core::backend::AccountDirectory;
use reviewmail_core::notify::{ExplicitRecipients, RecipientType};
use reviewmail_core::types::AccountId;

/// Per-message policy deciding which recipients may be added.
pub trait Admission {
    /// Site transport policy, applied to every address.
    fn can_email(&self, address: &Address) -> bool;

    fn admits_account(&self, account: &AccountState) -> bool;

    /// Applied to recipients that are plain addresses.
    fn admits_address(&self, address: &Address) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub bucket: RecipientType,
    pub address: Address,
    pub account: Option<AccountId>,
}

#[derive(Debug, Clone, Default)]
pub struct RecipientSet {
    entries: Vec<Recipient>,
}

impl RecipientSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains_account(&self, account: AccountId) -> bool {
        self.entries.iter().any(|r| r.account == Some(account))
    }

    pub fn contains_address(&self, address: &Address) -> bool {
        self.entries.iter().any(|r| &r.address == address)
    }

    pub fn bucket_of(&self, account: AccountId) -> Option<RecipientType> {
        self.entries
            .iter()
            .find(|r| r.account == Some(account))
            .map(|r| r.bucket)
    }

    pub fn accounts(&self) -> BTreeSet<AccountId> {
        self.entries.iter().filter_map(|r| r.account).collect()
    }

    pub fn addresses(&self, bucket: RecipientType) -> Vec<Address> {
        self.entries
            .iter()
            .filter(|r| r.bucket == bucket)
            .map(|r| r.address.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipient> {
        self.entries.iter()
    }

    /// Add an account by its preferred email. Returns whether it was added.
    pub fn add_account(
        &mut self,
        bucket: RecipientType,
        account: &AccountState,
        admission: &dyn Admission,
    ) -> bool {
        if self.contains_account(account.id) || !admission.admits_account(account) {
            return false;
        }
        let Some(address) = account.address() else {
            tracing::debug!(
                account_id = %account.id,
                "Not emailing account without an active preferred email"
            );
            return false;
        };
        self.insert(bucket, address, Some(account.id), admission)
    }

    /// Add a recipient that has no account. Returns whether it was added.
    pub fn add_address(
        &mut self,
        bucket: RecipientType,
        address: Address,
        admission: &dyn Admission,
    ) -> bool {
        if self.contains_address(&address) || !admission.admits_address(&address) {
            return false;
        }
        self.insert(bucket, address, None, admission)
    }

    fn insert(
        &mut self,
        bucket: RecipientType,
        address: Address,
        account: Option<AccountId>,
        admission: &dyn Admission,
    ) -> bool {
        if !address.is_valid() {
            tracing::warn!(email = %address.email, "Not emailing invalid email address");
            return false;
        }
        if !admission.can_email(&address) {
            tracing::debug!(email = %address.email, "Address rejected by mail transport policy");
            return false;
        }
        if self.contains_address(&address) {
            return false;
        }
        self.entries.push(Recipient {
            bucket,
            address,
            account,
        });
        true
    }

    /// Drop an account from every bucket.
    pub fn remove_account(&mut self, account: AccountId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|r| r.account != Some(account));
        before != self.entries.len()
    }

    /// Whether the message is worth sending at all.
    ///
    /// False for an empty body or an empty set, and for a set whose only
    /// recipient is the actor unless the caller named accounts explicitly.
    pub fn should_send(
        &self,
        text_body: &str,
        actor: Option<AccountId>,
        explicit: &ExplicitRecipients,
    ) -> bool {
        if text_body.trim().is_empty() || self.is_empty() {
            return false;
        }
        if explicit.is_empty() && self.entries.len() == 1 {
            if let Some(actor) = actor {
                return self.entries[0].account != Some(actor);
            }
        }
        true
    }

    /// Apply the actor's copy preference and every recipient's delivery
    /// preferences.
    ///
    /// With `CC_ON_OWN_COMMENTS` the actor is CC'd; otherwise the actor is
    /// removed unless named explicitly. Accounts with `DISABLED` strategy
    /// are dropped. When `html` is on, accounts preferring plaintext are
    /// moved into the returned set, to be sent without an HTML part.
    pub fn finalize(
        &mut self,
        actor: Option<&AccountState>,
        explicit: &ExplicitRecipients,
        directory: &dyn AccountDirectory,
        admission: &dyn Admission,
        html: bool,
    ) -> RecipientSet {
        if let Some(actor) = actor {
            if actor.email_strategy == EmailStrategy::CcOnOwnComments {
                self.add_account(RecipientType::Cc, actor, admission);
            } else if !explicit.contains(actor.id) {
                self.remove_account(actor.id);
            }
        }

        let mut plaintext = RecipientSet::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for recipient in std::mem::take(&mut self.entries) {
            let Some(id) = recipient.account else {
                kept.push(recipient);
                continue;
            };
            match directory.account(id) {
                Some(state) if state.email_strategy == EmailStrategy::Disabled => {
                    tracing::debug!(account_id = %id, "Not emailing account with email disabled");
                }
                Some(state) if html && state.email_format == EmailFormat::Plaintext => {
                    plaintext.entries.push(recipient);
                }
                Some(_) => kept.push(recipient),
                None => {
                    tracing::debug!(account_id = %id, "Dropping recipient for unknown account");
                }
            }
        }
        self.entries = kept;
        plaintext
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
