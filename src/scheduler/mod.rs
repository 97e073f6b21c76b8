//! Zone-batched greedy planning and KPI evaluation.
//!
//! # Algorithm
//!
//! [`ZoneAssigner`] balances zones over painters (heaviest zone to the
//! least-loaded painter). [`ScheduleBuilder`] then walks the zones and packs
//! each job's carpenter and painter work into per-resource calendars through
//! [`SlotAllocator`], whose peek/commit split keeps lookahead free of side
//! effects. The result is not optimal, but it is fast and deterministic.
//!
//! # KPI
//!
//! [`PlanKpi`] summarises a pass: jobs planned, deadline misses, on-time
//! rate, lateness and booked minutes per resource.
//!
//! # References
//!
//! - Graham (1969), "Bounds on Multiprocessing Timing Anomalies"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4

mod builder;
mod kpi;
mod slots;
mod zone;

pub use builder::{carpenter_minutes_for, PlanIssue, PlanReport, ScheduleBuilder};
pub use kpi::PlanKpi;
pub use slots::{compute_slots, Allocation, SlotAllocator, WorkCalendar};
pub use zone::{ZoneAssigner, ZoneAssignment, ZoneLoad};
