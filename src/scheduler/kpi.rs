//! Plan quality metrics (KPIs).
//!
//! Computes performance indicators over the planned jobs of a pass.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Jobs planned | Jobs with a plan attached |
//! | Deadline misses | Jobs whose first painter block starts after the deadline date |
//! | On-Time Rate | Fraction of planned jobs meeting their deadline |
//! | Max lateness | Largest single miss, in calendar days |
//! | Minutes by resource | Booked minutes per block label |
//! | Finish | Latest block end |
//!
//! Jobs without a deadline count as on time.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{Job, ResourceKind};

/// Plan performance indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanKpi {
    /// Jobs with a plan.
    pub jobs_planned: usize,
    /// Planned jobs starting after their deadline.
    pub deadline_misses: usize,
    /// Fraction of planned jobs on time (0.0..1.0).
    pub on_time_rate: f64,
    /// Largest miss in days.
    pub max_lateness_days: i64,
    /// Booked minutes per block label.
    pub minutes_by_resource: BTreeMap<String, i64>,
    /// Latest block end across all plans.
    pub finish: Option<NaiveDateTime>,
}

impl PlanKpi {
    /// Computes KPIs over `jobs`. Jobs without a plan are ignored.
    pub fn calculate<'a, I>(jobs: I) -> Self
    where
        I: IntoIterator<Item = &'a Job>,
    {
        let mut kpi = Self::default();
        let mut on_time = 0usize;

        for job in jobs {
            let Some(plan) = &job.plan else {
                continue;
            };
            kpi.jobs_planned += 1;

            for block in &plan.blocks {
                *kpi.minutes_by_resource.entry(block.label.clone()).or_insert(0) +=
                    block.duration_minutes();
            }
            kpi.finish = kpi.finish.max(plan.last_end());

            let start = plan.blocks_of(ResourceKind::Painter).map(|b| b.start).min();
            match (job.deadline, start) {
                (Some(deadline), Some(start)) if start.date() > deadline => {
                    let late = (start.date() - deadline).num_days();
                    kpi.deadline_misses += 1;
                    kpi.max_lateness_days = kpi.max_lateness_days.max(late);
                }
                _ => on_time += 1,
            }
        }

        kpi.on_time_rate = if kpi.jobs_planned == 0 {
            1.0
        } else {
            on_time as f64 / kpi.jobs_planned as f64
        };
        kpi
    }

    /// Whether the plan meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_lateness_days: i64, min_on_time_rate: f64) -> bool {
        self.max_lateness_days <= max_lateness_days && self.on_time_rate >= min_on_time_rate
    }
}
