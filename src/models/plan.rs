//! Plan (solution) model.
//!
//! A plan is the ordered list of time blocks attached to one job. The
//! same structure feeds both the initial allocation and later conflict
//! arbitration, which rewrites blocks in place.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{ResourceKind, TimeSlot};

/// One contiguous interval of work by one resource for one job.
///
/// Invariant: `end > start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanBlock {
    /// Kind of resource doing the work.
    pub kind: ResourceKind,
    /// Display label, e.g. `PAINTER (PAINTER_2)`.
    pub label: String,
    /// Block start (inclusive).
    pub start: NaiveDateTime,
    /// Block end (exclusive).
    pub end: NaiveDateTime,
}

impl PlanBlock {
    /// Creates a block covering `slot`.
    pub fn new(kind: ResourceKind, label: impl Into<String>, slot: TimeSlot) -> Self {
        Self {
            kind,
            label: label.into(),
            start: slot.start,
            end: slot.end,
        }
    }

    /// The block's interval.
    #[inline]
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start, self.end)
    }

    /// Block length in minutes.
    pub fn duration_minutes(&self) -> i64 {
        self.slot().duration_minutes()
    }
}

/// The time blocks scheduled for a single job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Owning job.
    pub job_id: String,
    /// Zone the job was batched under.
    pub zone: String,
    /// Blocks in creation order (carpentry first).
    pub blocks: Vec<PlanBlock>,
}

impl Plan {
    /// Creates an empty plan.
    pub fn new(job_id: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            zone: zone.into(),
            blocks: Vec::new(),
        }
    }

    /// Appends a block.
    pub fn push(&mut self, block: PlanBlock) {
        self.blocks.push(block);
    }

    /// Blocks of one resource kind.
    pub fn blocks_of(&self, kind: ResourceKind) -> impl Iterator<Item = &PlanBlock> {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }

    /// Whether any block of `kind` exists.
    pub fn has_kind(&self, kind: ResourceKind) -> bool {
        self.blocks_of(kind).next().is_some()
    }

    /// Earliest start across all blocks.
    pub fn first_start(&self) -> Option<NaiveDateTime> {
        self.blocks.iter().map(|b| b.start).min()
    }

    /// Latest end across all blocks.
    pub fn last_end(&self) -> Option<NaiveDateTime> {
        self.blocks.iter().map(|b| b.end).max()
    }

    /// Whether every carpenter block ends before every painter block starts.
    pub fn is_sequenced(&self) -> bool {
        let carp_end = self.blocks_of(ResourceKind::Carpenter).map(|b| b.end).max();
        let paint_start = self.blocks_of(ResourceKind::Painter).map(|b| b.start).min();
        match (carp_end, paint_start) {
            (Some(end), Some(start)) => end <= start,
            _ => true,
        }
    }

    /// Moves all work of `kind` to `slot`.
    ///
    /// Keeps one block per distinct label of that kind (at the position of
    /// its first occurrence) and sets each to `slot`. Returns the number of
    /// blocks left for the kind.
    pub fn reschedule_kind(&mut self, kind: ResourceKind, slot: TimeSlot) -> usize {
        let mut seen: Vec<String> = Vec::new();
        self.blocks.retain_mut(|b| {
            if b.kind != kind {
                return true;
            }
            if seen.contains(&b.label) {
                return false;
            }
            seen.push(b.label.clone());
            b.start = slot.start;
            b.end = slot.end;
            true
        });
        seen.len()
    }
}

/// A non-fatal issue recorded against a job during planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanWarning {
    /// The earliest available painter slot starts after the job's deadline.
    DeadlineMissed {
        /// Painter whose placement missed.
        resource_id: String,
        /// The job's deadline date.
        deadline: NaiveDate,
        /// Earliest start that could be offered.
        earliest_start: NaiveDateTime,
    },
    /// No day within the attempt limit had room for this painter.
    Unplaceable {
        /// Painter that could not be placed.
        resource_id: String,
        /// Attempts made before giving up.
        attempts: u32,
    },
}
