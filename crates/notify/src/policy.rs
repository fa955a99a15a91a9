//! Which recipient categories each event kind mails.
//!
//! Every kind is an [`EventPolicy`]: a message class plus an ordered list
//! of [`Step`]s. Steps run in order and the first bucket a recipient is
//! placed in wins, so the order encodes precedence. Each step is skipped
//! when the resolved notify scope is below [`Step::minimum`].

use reviewmail_core::notify::{NotifyHandling, NotifyType, RecipientType};

use crate::event::ChangeEventKind;

/// When project notify-configs take part in watcher resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigRule {
    Always,
    /// Skipped for work in progress and private changes.
    UnlessWipOrPrivate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Owner plus uploader, author and committer of the current patch set.
    Authors(RecipientType),
    /// Reviewers named by the event itself: TO for reviewers and reviewer
    /// addresses, CC for added CCs.
    EventReviewers,
    /// The reviewer an event removed, TO.
    RemovedReviewer,
    /// The new assignee, TO.
    Assignee,
    /// REVIEWER state to TO and CC state to CC.
    ReviewersByState,
    /// REVIEWER and CC state accounts, all CC.
    AllReviewersCc,
    /// Reviewers and CCs without accounts, CC.
    ReviewersByEmail,
    /// Accounts that starred the change, BCC.
    Starrers,
    Watchers {
        types: &'static [NotifyType],
        configs: ConfigRule,
        /// Watching project owners go to TO ahead of everyone else.
        promote_owners: bool,
    },
}

impl Step {
    pub fn minimum(&self) -> NotifyHandling {
        match self {
            Step::Authors(_) | Step::RemovedReviewer | Step::Assignee => NotifyHandling::Owner,
            Step::EventReviewers
            | Step::ReviewersByState
            | Step::AllReviewersCc
            | Step::ReviewersByEmail => NotifyHandling::OwnerReviewers,
            Step::Starrers | Step::Watchers { .. } => NotifyHandling::All,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::Authors(_) => "authors",
            Step::EventReviewers => "event_reviewers",
            Step::RemovedReviewer => "removed_reviewer",
            Step::Assignee => "assignee",
            Step::ReviewersByState => "reviewers_by_state",
            Step::AllReviewersCc => "all_reviewers",
            Step::ReviewersByEmail => "reviewers_by_email",
            Step::Starrers => "starrers",
            Step::Watchers { .. } => "watchers",
        }
    }
}

#[derive(Debug)]
pub struct EventPolicy {
    /// Value of the message type header and template selector.
    pub message_class: &'static str,
    pub steps: &'static [Step],
}

const fn watchers(types: &'static [NotifyType], configs: ConfigRule) -> Step {
    Step::Watchers {
        types,
        configs,
        promote_owners: false,
    }
}

pub const NEW_CHANGE: EventPolicy = EventPolicy {
    message_class: "newchange",
    steps: &[
        Step::ReviewersByState,
        Step::ReviewersByEmail,
        Step::Watchers {
            types: &[NotifyType::NewChanges, NotifyType::NewPatchsets],
            configs: ConfigRule::UnlessWipOrPrivate,
            promote_owners: true,
        },
    ],
};

pub const NEW_PATCH_SET: EventPolicy = EventPolicy {
    message_class: "newpatchset",
    steps: &[
        Step::EventReviewers,
        Step::ReviewersByState,
        Step::Authors(RecipientType::To),
        Step::ReviewersByEmail,
        Step::Starrers,
        watchers(&[NotifyType::NewPatchsets], ConfigRule::Always),
    ],
};

pub const COMMENT: EventPolicy = EventPolicy {
    message_class: "comment",
    steps: &[
        Step::Authors(RecipientType::To),
        Step::AllReviewersCc,
        Step::ReviewersByEmail,
        Step::Starrers,
        watchers(&[NotifyType::AllComments], ConfigRule::UnlessWipOrPrivate),
    ],
};

pub const ABANDONED: EventPolicy = EventPolicy {
    message_class: "abandon",
    steps: &[
        Step::Authors(RecipientType::To),
        Step::AllReviewersCc,
        Step::ReviewersByEmail,
        Step::Starrers,
        watchers(&[NotifyType::AbandonedChanges], ConfigRule::Always),
    ],
};

pub const RESTORED: EventPolicy = EventPolicy {
    message_class: "restore",
    steps: &[
        Step::Authors(RecipientType::To),
        Step::AllReviewersCc,
        Step::ReviewersByEmail,
        Step::Starrers,
        watchers(&[NotifyType::AllComments], ConfigRule::Always),
    ],
};

pub const MERGED: EventPolicy = EventPolicy {
    message_class: "merged",
    steps: &[
        Step::Authors(RecipientType::To),
        Step::AllReviewersCc,
        Step::ReviewersByEmail,
        Step::Starrers,
        watchers(
            &[NotifyType::AllComments, NotifyType::SubmittedChanges],
            ConfigRule::Always,
        ),
    ],
};

pub const REVIEWER_ADDED: EventPolicy = EventPolicy {
    message_class: "newchange",
    steps: &[
        Step::EventReviewers,
        Step::Authors(RecipientType::Cc),
        Step::AllReviewersCc,
        Step::ReviewersByEmail,
    ],
};

pub const REVIEWER_DELETED: EventPolicy = EventPolicy {
    message_class: "deleteReviewer",
    steps: &[
        Step::RemovedReviewer,
        Step::Authors(RecipientType::To),
        Step::AllReviewersCc,
        Step::ReviewersByEmail,
        Step::Starrers,
        watchers(&[NotifyType::AllComments], ConfigRule::Always),
    ],
};

pub const VOTE_DELETED: EventPolicy = EventPolicy {
    message_class: "deleteVote",
    steps: &[
        Step::Authors(RecipientType::To),
        Step::AllReviewersCc,
        Step::ReviewersByEmail,
        Step::Starrers,
        watchers(&[NotifyType::AllComments], ConfigRule::Always),
    ],
};

pub const ASSIGNEE_CHANGED: EventPolicy = EventPolicy {
    message_class: "setassignee",
    steps: &[Step::Assignee, Step::ReviewersByEmail],
};

/// Message on the original change of a revert. The revert change itself
/// gets a [`NEW_CHANGE`] message first.
pub const REVERTED: EventPolicy = EventPolicy {
    message_class: "revert",
    steps: &[
        Step::Authors(RecipientType::Cc),
        Step::AllReviewersCc,
        Step::ReviewersByEmail,
        Step::Starrers,
        watchers(&[NotifyType::AllComments], ConfigRule::Always),
    ],
};

pub fn policy_for(kind: &ChangeEventKind) -> &'static EventPolicy {
    match kind {
        ChangeEventKind::NewChange => &NEW_CHANGE,
        ChangeEventKind::NewPatchSet { .. } => &NEW_PATCH_SET,
        ChangeEventKind::Comment { .. } => &COMMENT,
        ChangeEventKind::Abandoned => &ABANDONED,
        ChangeEventKind::Restored => &RESTORED,
        ChangeEventKind::Merged => &MERGED,
        ChangeEventKind::ReviewerAdded { .. } => &REVIEWER_ADDED,
        ChangeEventKind::ReviewerDeleted { .. } => &REVIEWER_DELETED,
        ChangeEventKind::VoteDeleted { .. } => &VOTE_DELETED,
        ChangeEventKind::AssigneeChanged { .. } => &ASSIGNEE_CHANGED,
        ChangeEventKind::Reverted { .. } => &REVERTED,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
