//! Default notify scope per event, applied when the caller gives none.
//!
//! Work in progress keeps routine traffic down: uploads and reviewer
//! changes on a WIP change notify nobody, comments and abandons on a WIP
//! change whose review never started reach only the owner. Automated
//! comments reach only the owner on a WIP change and never go to starrers
//! or watchers.

use reviewmail_core::notify::NotifyHandling;

use crate::event::{ChangeEvent, ChangeEventKind};

pub fn default_handling(event: &ChangeEvent) -> NotifyHandling {
    let change = &event.change;
    let wip = change.work_in_progress;
    let unstarted_wip = wip && !change.review_started;

    match &event.kind {
        ChangeEventKind::NewChange
        | ChangeEventKind::NewPatchSet { .. }
        | ChangeEventKind::ReviewerAdded { .. }
            if wip =>
        {
            NotifyHandling::None
        }
        ChangeEventKind::Comment { .. } if event.kind.is_autogenerated() => {
            if wip {
                NotifyHandling::Owner
            } else {
                NotifyHandling::OwnerReviewers
            }
        }
        ChangeEventKind::Comment { .. } | ChangeEventKind::Abandoned if unstarted_wip => {
            NotifyHandling::Owner
        }
        ChangeEventKind::ReviewerDeleted { had_votes, .. } if wip => {
            if *had_votes {
                NotifyHandling::Owner
            } else {
                NotifyHandling::None
            }
        }
        _ => NotifyHandling::All,
    }
}

/// The caller's override, else the event's default.
pub fn resolve_handling(event: &ChangeEvent) -> NotifyHandling {
    event.notify.unwrap_or_else(|| default_handling(event))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
