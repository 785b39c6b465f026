//! Read-only projections for the caller's dashboard and validation queue.

use serde::Serialize;

use crate::access::Actor;
use crate::notes::NoteStatus;
use crate::roles::permissions::{NOTES_VALIDATE_FINAL, NOTES_VALIDATE_FIRST};
use crate::workflow::WorkflowConfig;

/// Values of `first_approved` on PENDING_VALIDATION notes the actor can act on.
///
/// Empty when the actor validates nothing. Fed straight into a
/// `first_approved = ANY($1)` filter.
pub fn pending_stages(actor: &Actor, config: WorkflowConfig) -> Vec<bool> {
    let first = actor.has_permission(NOTES_VALIDATE_FIRST);
    let last = actor.has_permission(NOTES_VALIDATE_FINAL);

    if !config.two_level_validation {
        return if first || last { vec![false] } else { vec![] };
    }

    let mut stages = Vec::with_capacity(2);
    if first {
        stages.push(false);
    }
    if last {
        stages.push(true);
    }
    stages
}

/// Count of authored notes in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: NoteStatus,
    pub count: i64,
}

/// Per-recipient reception counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceivedCounts {
    pub unread: i64,
    pub read: i64,
    pub archived: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    /// One entry per status, zero-filled, in lifecycle order.
    pub authored: Vec<StatusCount>,
    pub pending_validation: i64,
    pub received: ReceivedCounts,
    pub unread_notifications: i64,
}

/// Zero-fill sparse `(status, count)` rows into lifecycle order.
pub fn fill_status_counts(rows: &[(NoteStatus, i64)]) -> Vec<StatusCount> {
    NoteStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: rows
                .iter()
                .filter(|(s, _)| *s == status)
                .map(|(_, c)| *c)
                .sum(),
        })
        .collect()
}
