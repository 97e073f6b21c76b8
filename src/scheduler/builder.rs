//! Zone-batched, deadline-aware schedule builder.
//!
//! # Algorithm
//!
//! 1. Move every cursor past the blocks of jobs planned in earlier passes
//!    and count their starts against the daily cap.
//! 2. Assign every zone a home painter ([`ZoneAssigner`]).
//! 3. Walk zones heaviest first, jobs within a zone by arrival time.
//! 4. If the job needs carpentry, peek the carpenter first; its last
//!    block's end becomes the painters' earliest start.
//! 5. Split the painter minutes evenly over the selected painters (home
//!    painter first, then least-loaded by cursor).
//! 6. Per painter, peek candidates day by day: reject days already holding
//!    the daily task cap and check the deadline. A bounded number of
//!    attempts guards against spinning.
//! 7. Commit carpenter and painters together once at least one painter
//!    was accepted. A refused or unplaceable job books nothing.
//!
//! Priority chain: zone, arrival time, carpenter before painter,
//! least-loaded painter. It is fixed so that identical input always
//! yields identical plans.
//!
//! # Complexity
//! O(j * p * a) where j=jobs, p=painters per job, a=placement attempts.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::kpi::PlanKpi;
use super::slots::{Allocation, SlotAllocator, WorkCalendar};
use super::zone::{ZoneAssigner, ZoneAssignment};
use crate::config::{DeadlinePolicy, PlannerConfig};
use crate::error::PlanError;
use crate::export::{self, CalendarEvent};
use crate::models::{
    round_to_granularity, Job, JobStatus, Plan, PlanBlock, PlanWarning, Resource, ResourceKind,
    MIN_JOB_MINUTES,
};
use crate::validation;

/// Carpenter minutes derived from painter minutes.
///
/// `max(60, round(painter × ratio))`, rounded up to the slot granularity.
pub fn carpenter_minutes_for(painter_minutes: u32, ratio: f64) -> u32 {
    let scaled = (f64::from(painter_minutes) * ratio).round();
    // f64 → u32 casts saturate; negative/NaN ratios are rejected by validation.
    let scaled = scaled as u32;
    round_to_granularity(scaled.max(MIN_JOB_MINUTES))
}

/// A warning raised for one job during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanIssue {
    /// Affected job.
    pub job_id: String,
    /// What happened.
    pub warning: PlanWarning,
}

/// Result of a planning pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    /// Date of cursor day 0.
    pub start_date: NaiveDate,
    /// Zone batches and home painters.
    pub zone_assignment: ZoneAssignment,
    /// Plans attached in this pass, in processing order.
    pub plans: Vec<Plan>,
    /// Flat event list for calendar export.
    pub events: Vec<CalendarEvent>,
    /// Warnings raised.
    pub issues: Vec<PlanIssue>,
    /// Jobs left without a plan (strict deadline refusal or no painter placed).
    pub unscheduled: Vec<String>,
    /// Resources with their final cursors.
    pub resources: Vec<Resource>,
    /// Quality metrics over the jobs planned in this pass.
    pub kpi: PlanKpi,
}

impl PlanReport {
    /// An empty report for a pass with nothing to plan.
    pub fn empty(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            zone_assignment: ZoneAssignment::default(),
            plans: Vec::new(),
            events: Vec::new(),
            issues: Vec::new(),
            unscheduled: Vec::new(),
            resources: Vec::new(),
            kpi: PlanKpi::default(),
        }
    }

    /// Number of jobs planned.
    pub fn planned_count(&self) -> usize {
        self.plans.len()
    }
}

/// Builds plans for a batch of jobs.
#[derive(Debug, Clone)]
pub struct ScheduleBuilder {
    config: PlannerConfig,
}

impl ScheduleBuilder {
    /// Creates a builder.
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plans every ready job in `jobs`, writing plans, status and warnings
    /// back onto them.
    ///
    /// Jobs already `Planned` are left untouched. `today` anchors the plan
    /// start date so that runs are reproducible.
    pub fn build(&self, jobs: &mut [Job], today: NaiveDate) -> Result<PlanReport, PlanError> {
        validation::validate_input(&self.config, jobs).map_err(PlanError::InvalidInput)?;

        let calendar = WorkCalendar::new(self.config.plan_start(today), self.config.workday());
        let mut pass = Pass::new(&self.config, calendar);
        for plan in jobs
            .iter()
            .filter(|j| !j.status.is_ready())
            .filter_map(|j| j.plan.as_ref())
        {
            pass.reserve_existing(plan);
        }

        let assignment =
            ZoneAssigner::new().assign(jobs.iter().filter(|j| j.status.is_ready()), &pass.painter_ids());

        let index: HashMap<String, usize> = jobs
            .iter()
            .enumerate()
            .map(|(i, j)| (j.id.clone(), i))
            .collect();

        let mut report = PlanReport::empty(calendar.start_date);

        for zone in &assignment.zones {
            for job_id in &zone.job_ids {
                let Some(&idx) = index.get(job_id) else {
                    continue;
                };
                let job = &mut jobs[idx];
                let placement = pass.place(job, &zone.zone, zone.painter_id.as_deref());

                for warning in &placement.warnings {
                    log_warning(&job.id, warning);
                    report.issues.push(PlanIssue {
                        job_id: job.id.clone(),
                        warning: warning.clone(),
                    });
                }
                job.warnings = placement.warnings;

                match placement.plan {
                    Some(plan) => {
                        job.zone = zone.zone.clone();
                        job.plan = Some(plan.clone());
                        job.status = JobStatus::Planned;
                        report.events.extend(export::job_events(job));
                        report.plans.push(plan);
                    }
                    None => {
                        log::warn!("Job {} left unscheduled", job.id);
                        report.unscheduled.push(job.id.clone());
                    }
                }
            }
        }

        log::info!(
            "Planned {} jobs across {} zones from {} ({} issues)",
            report.plans.len(),
            assignment.zone_count(),
            calendar.start_date,
            report.issues.len()
        );

        let planned: HashSet<&str> = report.plans.iter().map(|p| p.job_id.as_str()).collect();
        report.kpi = PlanKpi::calculate(jobs.iter().filter(|j| planned.contains(j.id.as_str())));
        report.zone_assignment = assignment;
        report.resources = pass.into_resources();
        Ok(report)
    }
}

fn log_warning(job_id: &str, warning: &PlanWarning) {
    match warning {
        PlanWarning::DeadlineMissed {
            resource_id,
            deadline,
            earliest_start,
        } => log::warn!(
            "Job {job_id}: {resource_id} cannot start before deadline {deadline} (earliest {earliest_start})"
        ),
        PlanWarning::Unplaceable {
            resource_id,
            attempts,
        } => log::warn!("Job {job_id}: {resource_id} unplaceable after {attempts} attempts"),
    }
}

/// Outcome of placing one job.
struct Placement {
    plan: Option<Plan>,
    warnings: Vec<PlanWarning>,
}

/// Mutable state of one planning pass. Owns every resource cursor.
struct Pass<'a> {
    config: &'a PlannerConfig,
    calendar: WorkCalendar,
    carpenter: SlotAllocator,
    painters: Vec<SlotAllocator>,
    /// Jobs started per (painter index, date).
    day_counts: HashMap<(usize, NaiveDate), u32>,
}

impl<'a> Pass<'a> {
    fn new(config: &'a PlannerConfig, calendar: WorkCalendar) -> Self {
        Self {
            config,
            calendar,
            carpenter: SlotAllocator::new(Resource::carpenter(), calendar),
            painters: (1..=config.num_painters)
                .map(|n| SlotAllocator::new(Resource::painter(n), calendar))
                .collect(),
            day_counts: HashMap::new(),
        }
    }

    fn painter_ids(&self) -> Vec<String> {
        self.painters
            .iter()
            .map(|p| p.resource().id.clone())
            .collect()
    }

    fn into_resources(self) -> Vec<Resource> {
        std::iter::once(self.carpenter)
            .chain(self.painters)
            .map(SlotAllocator::into_resource)
            .collect()
    }

    /// Moves cursors and day counts past the blocks of a job planned in an
    /// earlier pass. Blocks of resources not in this pass are ignored.
    fn reserve_existing(&mut self, plan: &Plan) {
        let mut first_starts: HashMap<usize, NaiveDateTime> = HashMap::new();
        for block in &plan.blocks {
            match block.kind {
                ResourceKind::Carpenter => self.carpenter.reserve_until(block.end),
                ResourceKind::Painter => {
                    let Some(idx) = self
                        .painters
                        .iter()
                        .position(|p| p.resource().block_label() == block.label)
                    else {
                        continue;
                    };
                    self.painters[idx].reserve_until(block.end);
                    let first = first_starts.entry(idx).or_insert(block.start);
                    *first = (*first).min(block.start);
                }
            }
        }
        for (idx, start) in first_starts {
            if start.date() >= self.calendar.start_date {
                *self.day_counts.entry((idx, start.date())).or_insert(0) += 1;
            }
        }
    }

    /// Decides every resource's slots for `job` with `peek`, then commits
    /// them only if the job gets a plan.
    fn place(&mut self, job: &Job, zone: &str, home_painter: Option<&str>) -> Placement {
        let mut warnings = Vec::new();
        let painter_minutes = job.billable_painter_minutes();

        let carpentry = job.needs_carpentry().then(|| {
            let minutes = carpenter_minutes_for(painter_minutes, self.config.carpenter_ratio);
            (minutes, self.carpenter.peek(minutes, None, 0))
        });
        let earliest = carpentry.as_ref().and_then(|(_, a)| a.end());

        let chosen = self.select_painters(home_painter);
        let per_painter = painter_minutes.div_ceil(chosen.len().max(1) as u32);
        let deadline_limit = job.deadline.map(|d| (d, self.calendar.workday.closing(d)));

        let mut accepted = Vec::new();
        for idx in chosen {
            match self.find_painter_slot(idx, per_painter, earliest, deadline_limit, &mut warnings) {
                PainterOutcome::Placed(candidate) => accepted.push(candidate),
                PainterOutcome::Unplaceable => {}
                PainterOutcome::Refused => {
                    return Placement {
                        plan: None,
                        warnings,
                    };
                }
            }
        }

        // Carpentry alone is not a plan; nothing is booked and the job
        // waits for the next pass.
        if accepted.is_empty() {
            return Placement {
                plan: None,
                warnings,
            };
        }

        let mut plan = Plan::new(&job.id, zone);
        if let Some((minutes, candidate)) = carpentry {
            let committed = self.carpenter.commit(minutes, None);
            debug_assert_eq!(committed, candidate);
            let label = self.carpenter.resource().block_label();
            for slot in &committed.slots {
                plan.push(PlanBlock::new(ResourceKind::Carpenter, label.clone(), *slot));
            }
        }
        for candidate in accepted {
            plan.blocks.extend(self.commit_painter(candidate, per_painter, earliest));
        }

        Placement {
            plan: Some(plan),
            warnings,
        }
    }

    /// Home painter first (or the least-loaded one if the zone has none),
    /// then further least-loaded painters up to `painters_per_job`.
    fn select_painters(&self, home_painter: Option<&str>) -> Vec<usize> {
        let mut by_load: Vec<usize> = (0..self.painters.len()).collect();
        by_load.sort_by_key(|&i| (self.painters[i].cursor(), i));

        let primary = home_painter
            .and_then(|id| self.painters.iter().position(|p| p.resource().id == id))
            .or_else(|| by_load.first().copied());

        let mut chosen: Vec<usize> = primary.into_iter().collect();
        let wanted = self.config.painters_per_job.max(1);
        for idx in by_load {
            if chosen.len() >= wanted {
                break;
            }
            if !chosen.contains(&idx) {
                chosen.push(idx);
            }
        }
        chosen
    }

    /// Finds the first acceptable day for painter `idx` without moving
    /// any cursor.
    fn find_painter_slot(
        &self,
        idx: usize,
        minutes: u32,
        earliest: Option<NaiveDateTime>,
        deadline_limit: Option<(NaiveDate, NaiveDateTime)>,
        warnings: &mut Vec<PlanWarning>,
    ) -> PainterOutcome {
        let max_attempts = self.config.max_placement_attempts;
        let cap = self.config.max_tasks_per_painter_per_day;
        let painter = &self.painters[idx];
        let mut deadline_limit = deadline_limit;
        let mut extra_days = 0u32;
        let mut attempts = 0u32;

        while attempts < max_attempts {
            let allocation = painter.peek(minutes, earliest, extra_days);
            let Some(start) = allocation.start() else {
                break;
            };

            if let Some((deadline, limit)) = deadline_limit {
                if start > limit {
                    warnings.push(PlanWarning::DeadlineMissed {
                        resource_id: painter.resource().id.clone(),
                        deadline,
                        earliest_start: start,
                    });
                    match self.config.deadline_policy {
                        DeadlinePolicy::Strict => return PainterOutcome::Refused,
                        DeadlinePolicy::Advisory => {
                            deadline_limit = None;
                            continue;
                        }
                    }
                }
            }

            if self.day_counts.get(&(idx, start.date())).copied().unwrap_or(0) >= cap {
                extra_days += 1;
                attempts += 1;
                continue;
            }

            return PainterOutcome::Placed(PainterCandidate {
                idx,
                extra_days,
                allocation,
            });
        }

        warnings.push(PlanWarning::Unplaceable {
            resource_id: painter.resource().id.clone(),
            attempts,
        });
        PainterOutcome::Unplaceable
    }

    fn commit_painter(
        &mut self,
        candidate: PainterCandidate,
        minutes: u32,
        earliest: Option<NaiveDateTime>,
    ) -> Vec<PlanBlock> {
        let painter = &mut self.painters[candidate.idx];
        for _ in 0..candidate.extra_days {
            painter.advance_day();
        }
        let committed = painter.commit(minutes, earliest);
        debug_assert_eq!(committed, candidate.allocation);

        if let Some(start) = committed.start() {
            *self
                .day_counts
                .entry((candidate.idx, start.date()))
                .or_insert(0) += 1;
        }

        let label = painter.resource().block_label();
        committed
            .slots
            .iter()
            .map(|slot| PlanBlock::new(ResourceKind::Painter, label.clone(), *slot))
            .collect()
    }
}

/// An accepted painter placement, not yet committed.
struct PainterCandidate {
    idx: usize,
    extra_days: u32,
    allocation: Allocation,
}

enum PainterOutcome {
    Placed(PainterCandidate),
    Unplaceable,
    Refused,
}
