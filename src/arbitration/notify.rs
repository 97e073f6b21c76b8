//! Notices raised by the change desk.
//!
//! Delivery sits behind the [`Notifier`] trait. The crate ships a logging
//! notifier for the CLI and an in-memory one for inspection in tests.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::models::{ResourceKind, TimeSlot};

/// A message for the people affected by a plan change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A kind's blocks were moved; sent to the job's other resources.
    ScheduleChanged {
        /// Job whose plan changed.
        job_id: String,
        /// Resource kind whose blocks moved.
        changed: ResourceKind,
        /// New interval of the moved blocks.
        slot: TimeSlot,
        /// Labels of the other resources on the job.
        recipients: Vec<String>,
    },
    /// A proposal collided and awaits a decision; sent to the arbiter.
    ConflictRaised {
        /// Id of the stored pending change.
        pending_id: u64,
        /// Job the proposal targets.
        job_id: String,
        /// Resource kind that asked to move.
        kind: ResourceKind,
        /// Proposed interval.
        slot: TimeSlot,
        /// Label of the block it collided with.
        conflicting_label: String,
    },
}

/// Delivers notices. Transport is up to the implementation and must not
/// fail the plan change that triggered it.
pub trait Notifier: Send + Sync {
    /// Delivers one notice. Failures are the implementation's to log.
    fn notify(&self, notice: &Notice);
}

/// Writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::ScheduleChanged {
                job_id,
                changed,
                slot,
                recipients,
            } => log::info!(
                "Job {job_id}: {changed} moved to {} - {}; notifying {}",
                slot.start,
                slot.end,
                if recipients.is_empty() {
                    "nobody".to_string()
                } else {
                    recipients.join(", ")
                }
            ),
            Notice::ConflictRaised {
                pending_id,
                job_id,
                kind,
                slot,
                conflicting_label,
            } => log::warn!(
                "Job {job_id}: {kind} at {} - {} collides with {conflicting_label}; pending change {pending_id} needs a decision",
                slot.start,
                slot.end
            ),
        }
    }
}

/// Keeps notices in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotifier {
    /// Creates a notifier with no notices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices received so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: &Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice.clone());
        }
    }
}
