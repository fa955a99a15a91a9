//! Recipient population for one message about one change.

use std::collections::BTreeSet;

use reviewmail_core::account::{AccountState, EmailStrategy};
use reviewmail_core::address::Address;
use reviewmail_core::backend::{ChangePermissions, QueryUser};
use reviewmail_core::change::{ChangeSnapshot, StarLabels, IGNORE_LABEL, STAR_LABEL};
use reviewmail_core::notify::{NotifyHandling, RecipientType};
use reviewmail_core::types::AccountId;

use crate::error::NotifyError;
use crate::event::{ChangeEvent, ChangeEventKind, RemovedReviewer};
use crate::filter::WatchFilter;
use crate::notifier::Collaborators;
use crate::policy::{ConfigRule, EventPolicy, Step};
use crate::recipients::{Admission, RecipientSet};
use crate::sender::MailSender;
use crate::watchers::{ProjectWatchResolver, Watchers};

/// Who may receive mail about a particular change.
pub struct ChangeAdmission<'a> {
    permissions: &'a dyn ChangePermissions,
    sender: &'a dyn MailSender,
    change: &'a ChangeSnapshot,
    project_readable: bool,
    /// The actor may only mail the change's authors.
    email_only_authors: bool,
    watcher_accounts: BTreeSet<AccountId>,
    watcher_emails: BTreeSet<Address>,
}

impl Admission for ChangeAdmission<'_> {
    fn can_email(&self, address: &Address) -> bool {
        self.sender.can_email(&address.email)
    }

    fn admits_account(&self, account: &AccountState) -> bool {
        if !self.project_readable {
            return false;
        }
        if self.email_only_authors && !self.change.is_author(account.id) {
            return false;
        }
        if account.email_strategy == EmailStrategy::AttentionSetOnly
            && !self.change.attention_set.contains(&account.id)
            && !self.watcher_accounts.contains(&account.id)
        {
            return false;
        }
        self.permissions
            .can_read(&QueryUser::Account(account.id), self.change)
    }

    fn admits_address(&self, address: &Address) -> bool {
        if !self.project_readable || self.email_only_authors {
            return false;
        }
        // Notify-config addresses come from project owners and are trusted.
        if self.watcher_emails.contains(address) {
            return true;
        }
        self.permissions.can_read(&QueryUser::Anonymous, self.change)
    }
}

pub struct ChangeEmail<'a> {
    deps: &'a Collaborators,
    event: &'a ChangeEvent,
    change: &'a ChangeSnapshot,
    policy: &'static EventPolicy,
    handling: NotifyHandling,
    stars: StarLabels,
    admission: ChangeAdmission<'a>,
    recipients: RecipientSet,
}

impl<'a> ChangeEmail<'a> {
    /// Prepare a message about `change` (the event's change, or the new
    /// change of a revert).
    pub fn new(
        deps: &'a Collaborators,
        event: &'a ChangeEvent,
        change: &'a ChangeSnapshot,
        policy: &'static EventPolicy,
        handling: NotifyHandling,
    ) -> Result<Self, NotifyError> {
        let stars = deps.stars.stars(change.id).map_err(NotifyError::Stars)?;
        let project_readable = deps
            .projects
            .project(&change.project)
            .map_or(true, |p| p.status.permits_read());
        let email_only_authors = event
            .actor
            .is_some_and(|actor| !deps.permissions.can_email_reviewers(actor, change));
        if email_only_authors {
            tracing::debug!(
                change_id = %change.id,
                "Actor cannot email reviewers, limiting recipients to authors"
            );
        }

        Ok(Self {
            deps,
            event,
            change,
            policy,
            handling,
            stars,
            admission: ChangeAdmission {
                permissions: deps.permissions.as_ref(),
                sender: deps.sender.as_ref(),
                change,
                project_readable,
                email_only_authors,
                watcher_accounts: BTreeSet::new(),
                watcher_emails: BTreeSet::new(),
            },
            recipients: RecipientSet::new(),
        })
    }

    pub fn change(&self) -> &ChangeSnapshot {
        self.change
    }

    pub fn policy(&self) -> &'static EventPolicy {
        self.policy
    }

    pub fn handling(&self) -> NotifyHandling {
        self.handling
    }

    pub fn recipients(&self) -> &RecipientSet {
        &self.recipients
    }

    /// Split borrow for finalization.
    pub fn parts_mut(&mut self) -> (&mut RecipientSet, &ChangeAdmission<'a>) {
        (&mut self.recipients, &self.admission)
    }

    /// Run the explicit accounts and every step the scope allows, then drop
    /// accounts that ignore the change.
    pub fn populate(&mut self) {
        let event = self.event;
        for (bucket, account) in event.notify_accounts.iter() {
            self.add_account(bucket, account);
        }

        for step in self.policy.steps {
            if !self.handling.allows(step.minimum()) {
                tracing::trace!(step = step.name(), handling = %self.handling, "Step below notify scope");
                continue;
            }
            self.run_step(step);
        }

        self.remove_ignoring();
    }

    fn run_step(&mut self, step: &Step) {
        let deps = self.deps;
        let event = self.event;
        let change = self.change;
        match step {
            Step::Authors(bucket) => {
                for account in change.authors() {
                    self.add_account(*bucket, account);
                }
            }
            Step::EventReviewers => self.add_event_reviewers(),
            Step::RemovedReviewer => {
                if let ChangeEventKind::ReviewerDeleted { reviewer, .. } = &event.kind {
                    match reviewer {
                        RemovedReviewer::Account(id) => self.add_account(RecipientType::To, *id),
                        RemovedReviewer::Address(address) => {
                            self.add_address(RecipientType::To, address.clone())
                        }
                    }
                }
            }
            Step::Assignee => {
                if let ChangeEventKind::AssigneeChanged { assignee, .. } = &event.kind {
                    self.add_account(RecipientType::To, *assignee);
                }
            }
            Step::ReviewersByState => {
                for account in &change.reviewers {
                    self.add_account(RecipientType::To, *account);
                }
                for account in &change.ccs {
                    self.add_account(RecipientType::Cc, *account);
                }
            }
            Step::AllReviewersCc => {
                for account in change.all_reviewers() {
                    self.add_account(RecipientType::Cc, account);
                }
            }
            Step::ReviewersByEmail => {
                for address in change.all_by_email() {
                    self.add_address(RecipientType::Cc, address);
                }
            }
            Step::Starrers => {
                let starrers: Vec<AccountId> = self
                    .stars
                    .iter()
                    .filter(|(_, labels)| labels.contains(STAR_LABEL))
                    .map(|(account, _)| *account)
                    .collect();
                for account in starrers {
                    self.add_account(RecipientType::Bcc, account);
                }
            }
            Step::Watchers {
                types,
                configs,
                promote_owners,
            } => {
                let include_configs = match configs {
                    ConfigRule::Always => true,
                    ConfigRule::UnlessWipOrPrivate => !change.work_in_progress && !change.private,
                };
                let resolver = ProjectWatchResolver::new(
                    deps.accounts.as_ref(),
                    deps.groups.as_ref(),
                    deps.projects.as_ref(),
                    WatchFilter::new(deps.filters.as_ref(), deps.permissions.as_ref()),
                );
                let watchers = resolver.resolve_all(types, change, include_configs);
                if *promote_owners {
                    for account in watchers.all_accounts() {
                        if resolver.is_project_owner(account, change) {
                            self.admission.watcher_accounts.insert(account);
                            self.add_account(RecipientType::To, account);
                        }
                    }
                }
                self.add_watchers(watchers);
            }
        }
    }

    fn add_event_reviewers(&mut self) {
        let event = self.event;
        match &event.kind {
            ChangeEventKind::ReviewerAdded {
                reviewers,
                addresses,
            } => {
                for account in reviewers {
                    self.add_account(RecipientType::To, *account);
                }
                for address in addresses {
                    self.add_address(RecipientType::To, address.clone());
                }
            }
            ChangeEventKind::NewPatchSet {
                added_reviewers,
                added_ccs,
            } => {
                for account in added_reviewers {
                    self.add_account(RecipientType::To, *account);
                }
                for account in added_ccs {
                    self.add_account(RecipientType::Cc, *account);
                }
            }
            _ => {}
        }
    }

    fn add_watchers(&mut self, watchers: Watchers) {
        for (bucket, list) in watchers.lists() {
            self.admission
                .watcher_accounts
                .extend(list.accounts.iter().copied());
            for account in &list.accounts {
                self.add_account(bucket, *account);
            }
            self.admission
                .watcher_emails
                .extend(list.emails.iter().cloned());
            for address in &list.emails {
                self.add_address(bucket, address.clone());
            }
        }
    }

    fn add_account(&mut self, bucket: RecipientType, account: AccountId) {
        match self.deps.accounts.account(account) {
            Some(state) => {
                self.recipients.add_account(bucket, &state, &self.admission);
            }
            None => {
                tracing::debug!(account_id = %account, "Not emailing unknown account");
            }
        }
    }

    fn add_address(&mut self, bucket: RecipientType, address: Address) {
        self.recipients.add_address(bucket, address, &self.admission);
    }

    fn remove_ignoring(&mut self) {
        let ignoring: Vec<AccountId> = self
            .stars
            .iter()
            .filter(|(_, labels)| labels.contains(IGNORE_LABEL))
            .map(|(account, _)| *account)
            .filter(|account| !self.event.notify_accounts.contains(*account))
            .collect();
        for account in ignoring {
            if self.recipients.remove_account(account) {
                tracing::debug!(account_id = %account, "Not emailing account that ignores the change");
            }
        }
    }
}
