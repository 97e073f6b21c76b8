//! Zone-balanced job planning for painter and carpenter crews.
//!
//! Packs service jobs into non-overlapping per-worker calendar blocks that
//! respect the workday, a daily task cap, carpentry-before-painting
//! sequencing and optional deadlines. Once planned, reported time changes
//! are either applied directly or, if they collide with another worker's
//! block on the same job, parked for a human decision.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Job`, `Plan`, `PlanBlock`, `Resource`,
//!   `TimeSlot`, `Workday`, `PendingChange`
//! - **`scheduler`**: Zone assignment, slot allocation, the schedule builder
//!   and plan KPIs
//! - **`arbitration`**: Conflict detection and the approve/reject flow
//! - **`store`**: Job persistence behind the `JobStore` trait
//! - **`pipeline`**: One load → plan → save pass
//! - **`export`**: Calendar events and iCalendar output
//! - **`validation`**: Input integrity checks (duplicate IDs, workday, limits)
//! - **`config`**: Planner configuration from YAML and environment
//!
//! # Determinism
//!
//! Given the same jobs, configuration and `today`, a planning pass
//! produces identical plans. Every ordering is explicit: zones by load
//! then code, jobs by arrival then ID, painters by load then index.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Graham (1969), "Bounds on Multiprocessing Timing Anomalies"

pub mod arbitration;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod validation;
