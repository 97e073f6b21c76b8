//! Pending change model.
//!
//! A pending change is a reported time revision that collided with another
//! resource's block on the same job and is waiting for a human decision.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ResourceKind, TimeSlot};

/// Arbitration state of a pending change.
///
/// `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    /// Waiting for a decision.
    Pending,
    /// Applied to the plan.
    Approved,
    /// Discarded; plan untouched.
    Rejected,
}

impl ChangeStatus {
    /// Whether no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChangeStatus::Pending)
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeStatus::Pending => "PENDING",
            ChangeStatus::Approved => "APPROVED",
            ChangeStatus::Rejected => "REJECTED",
        };
        f.pad(s)
    }
}

/// The data of a proposed change before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Job whose plan would change.
    pub job_id: String,
    /// Resource kind whose blocks would move.
    pub kind: ResourceKind,
    /// Proposed new start.
    pub new_start: NaiveDateTime,
    /// Proposed length in minutes.
    pub duration_minutes: u32,
}

impl ChangeRequest {
    /// Creates a change request.
    pub fn new(
        job_id: impl Into<String>,
        kind: ResourceKind,
        new_start: NaiveDateTime,
        duration_minutes: u32,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
            new_start,
            duration_minutes,
        }
    }

    /// End of the proposed interval, or `None` past the representable range.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.new_start
            .checked_add_signed(TimeDelta::minutes(i64::from(self.duration_minutes)))
    }

    /// The proposed interval `[new_start, new_start + duration)`, clamped
    /// at the largest representable time.
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.new_start, self.end().unwrap_or(NaiveDateTime::MAX))
    }
}

/// A stored change awaiting (or having received) arbitration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    /// Store-assigned identifier.
    pub id: u64,
    /// The proposed change.
    #[serde(flatten)]
    pub request: ChangeRequest,
    /// Label of the block the proposal collided with.
    pub conflicting_label: String,
    /// Arbitration state.
    pub status: ChangeStatus,
    /// When the conflict was detected.
    pub created_at: NaiveDateTime,
}
