//! One planning pass over the job store.

use chrono::NaiveDate;

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::scheduler::{PlanReport, ScheduleBuilder};
use crate::store::JobStore;

/// Loads every job, plans the ready ones and saves the batch atomically.
///
/// Jobs already planned are saved back untouched. If the save fails
/// nothing is written. A pass with nothing ready writes nothing and returns
/// an empty report.
pub fn run_planning_pass(
    store: &dyn JobStore,
    config: &PlannerConfig,
    today: NaiveDate,
) -> Result<PlanReport, PlanError> {
    let mut jobs = store.load_jobs()?;
    let ready = jobs.iter().filter(|j| j.status.is_ready()).count();
    log::info!("Planning pass for {today}: {ready} of {} jobs ready", jobs.len());

    if ready == 0 {
        return Ok(PlanReport::empty(config.plan_start(today)));
    }

    let report = ScheduleBuilder::new(config.clone()).build(&mut jobs, today)?;
    store.save_jobs(&mut jobs)?;
    log::info!(
        "Saved {} jobs ({} newly planned)",
        jobs.len(),
        report.planned_count()
    );
    Ok(report)
}
