//! Conflict detection and arbitration for reported time changes.
//!
//! A worker reports that their work on a planned job moves to a new
//! interval. If the interval overlaps another resource kind's block on the
//! same job, the change waits for a human decision; otherwise it is applied
//! at once.

mod desk;
mod detector;
mod notify;

pub use desk::{ChangeDesk, ProposalOutcome};
pub use detector::find_conflict;
pub use notify::{LogNotifier, MemoryNotifier, Notice, Notifier};
