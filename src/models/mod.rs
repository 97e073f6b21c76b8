//! Planning domain models.
//!
//! Provides the data types shared by slot allocation and conflict
//! arbitration. A job's [`Plan`] (its ordered list of [`PlanBlock`]s) is
//! the structure both subsystems read and write.
//!
//! # Domain Mappings
//!
//! | painter-planner | Meaning |
//! |-----------------|---------|
//! | Job | Customer order at one address |
//! | Resource | Painter or the shared carpenter |
//! | PlanBlock | One contiguous interval of work |
//! | PendingChange | Reported delay awaiting arbitration |

mod calendar;
mod job;
mod pending;
mod plan;
mod resource;

pub use calendar::{round_to_granularity, TimeSlot, Workday, SLOT_GRANULARITY_MINUTES};
pub use job::{parse_deadline, zone_for_address, Job, JobStatus, MIN_JOB_MINUTES, UNKNOWN_ZONE};
pub use pending::{ChangeRequest, ChangeStatus, PendingChange};
pub use plan::{Plan, PlanBlock, PlanWarning};
pub use resource::{Cursor, Resource, ResourceKind};
