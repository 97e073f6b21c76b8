//! End-to-end planning properties over seeded random batches, plus the
//! reference scenarios driven through the store and the change desk.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use painter_planner::arbitration::{ChangeDesk, MemoryNotifier, ProposalOutcome};
use painter_planner::config::{DeadlinePolicy, PlannerConfig};
use painter_planner::models::{
    ChangeStatus, Cursor, Job, JobStatus, PlanWarning, ResourceKind, TimeSlot,
};
use painter_planner::pipeline::run_planning_pass;
use painter_planner::scheduler::{PlanReport, ScheduleBuilder};
use painter_planner::store::{JobStore, JsonFileStore, MemoryStore};

const ADDRESSES: [&str; 6] = [
    "Nørregade 4, 8000 Aarhus C",
    "Vestergade 12, 5000 Odense C",
    "Strøget 1, 1100 København K",
    "Algade 3, 9000 Aalborg",
    "Gl. Kongevej 7, 1850 Frederiksberg C",
    "ukendt adresse",
];

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

/// Plan start with the default offset of one day.
fn at(day: u64, h: u32, m: u32) -> NaiveDateTime {
    (today() + Days::new(1 + day)).and_hms_opt(h, m, 0).unwrap()
}

fn random_jobs(rng: &mut SmallRng, n: usize) -> Vec<Job> {
    let base = today().and_hms_opt(0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let received = base - TimeDelta::minutes(rng.random_range(0..3 * 24 * 60));
            let address = ADDRESSES[rng.random_range(0..ADDRESSES.len())];
            let mut job = Job::new(format!("J{i:03}"), address, rng.random_range(0..=900), received);
            if rng.random_bool(0.3) {
                job = job.with_carpentry(rng.random_range(30..=240));
            }
            if rng.random_bool(0.3) {
                job = job.with_deadline(today() + Days::new(rng.random_range(0..10)));
            }
            job
        })
        .collect()
}

fn random_config(rng: &mut SmallRng) -> PlannerConfig {
    let num_painters = rng.random_range(1..=6);
    PlannerConfig {
        num_painters,
        max_tasks_per_painter_per_day: rng.random_range(1..=3),
        painters_per_job: rng.random_range(1..=num_painters.min(2)),
        deadline_policy: if rng.random_bool(0.5) {
            DeadlinePolicy::Strict
        } else {
            DeadlinePolicy::Advisory
        },
        ..PlannerConfig::default()
    }
}

fn plan_random(seed: u64) -> (PlannerConfig, Vec<Job>, PlanReport) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let config = random_config(&mut rng);
    let n = rng.random_range(10..60);
    let mut jobs = random_jobs(&mut rng, n);
    let report = ScheduleBuilder::new(config.clone())
        .build(&mut jobs, today())
        .unwrap();
    (config, jobs, report)
}

fn assert_no_double_booking(seed: u64, jobs: &[Job]) {
    let mut by_label: BTreeMap<String, Vec<TimeSlot>> = BTreeMap::new();
    for job in jobs {
        for block in job.plan.iter().flat_map(|p| &p.blocks) {
            by_label.entry(block.label.clone()).or_default().push(block.slot());
        }
    }
    for (label, mut slots) in by_label {
        slots.sort();
        for pair in slots.windows(2) {
            assert!(
                pair[0].end <= pair[1].start,
                "seed {seed}: {label} double-booked: {:?} / {:?}",
                pair[0],
                pair[1]
            );
        }
    }
}

fn assert_daily_cap(seed: u64, cap: u32, jobs: &[Job]) {
    let mut starts: HashMap<(String, NaiveDate), u32> = HashMap::new();
    for job in jobs {
        let Some(plan) = &job.plan else { continue };
        let mut first_by_label: BTreeMap<&str, NaiveDateTime> = BTreeMap::new();
        for b in plan.blocks_of(ResourceKind::Painter) {
            let first = first_by_label.entry(b.label.as_str()).or_insert(b.start);
            *first = (*first).min(b.start);
        }
        for (label, start) in first_by_label {
            *starts.entry((label.to_string(), start.date())).or_insert(0) += 1;
        }
    }
    for ((label, date), count) in starts {
        assert!(count <= cap, "seed {seed}: {label} starts {count} jobs on {date}");
    }
}

#[test]
fn no_resource_is_double_booked() {
    for seed in 0..40 {
        let (_, jobs, _) = plan_random(seed);
        assert_no_double_booking(seed, &jobs);
    }
}

#[test]
fn repeated_passes_respect_existing_plans() {
    for seed in 0..30 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let config = random_config(&mut rng);
        let n = rng.random_range(10..40);
        let mut batch = random_jobs(&mut rng, n);
        let later = batch.split_off(n / 2);

        let store = store_with(batch);
        run_planning_pass(&*store, &config, today()).unwrap();

        let mut jobs = store.load_jobs().unwrap();
        jobs.extend(later.into_iter().map(|mut j| {
            j.id = format!("{}b", j.id);
            j
        }));
        store.save_jobs(&mut jobs).unwrap();
        run_planning_pass(&*store, &config, today()).unwrap();

        let jobs = store.load_jobs().unwrap();
        assert_no_double_booking(seed, &jobs);
        assert_daily_cap(seed, config.max_tasks_per_painter_per_day, &jobs);
    }
}

/// Cursor just past `end`, with the default 07:00 workday.
fn cursor_after(start_date: NaiveDate, end: NaiveDateTime) -> Cursor {
    let opening = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
    Cursor::new(
        (end.date() - start_date).num_days() as u32,
        (end.time() - opening).num_minutes() as u32,
    )
}

#[test]
fn unplanned_jobs_leave_no_bookings() {
    for seed in 0..40 {
        let (_, jobs, report) = plan_random(seed);

        for resource in &report.resources {
            let label = resource.block_label();
            let last_end = jobs
                .iter()
                .flat_map(|j| j.plan.iter().flat_map(|p| &p.blocks))
                .filter(|b| b.label == label)
                .map(|b| b.end)
                .max();
            let expected = last_end
                .map(|end| cursor_after(report.start_date, end))
                .unwrap_or_default();
            assert_eq!(
                resource.cursor, expected,
                "seed {seed}: {} holds time outside any plan",
                resource.id
            );
        }
    }
}

#[test]
fn carpentry_precedes_painting() {
    for seed in 0..40 {
        let (_, jobs, _) = plan_random(seed);
        for job in jobs.iter().filter(|j| j.plan.is_some()) {
            let plan = job.plan.as_ref().unwrap();
            assert!(plan.is_sequenced(), "seed {seed}: {} not sequenced", job.id);
            assert!(plan.has_kind(ResourceKind::Painter));
            assert_eq!(plan.has_kind(ResourceKind::Carpenter), job.needs_carpentry());
        }
    }
}

#[test]
fn daily_start_cap_holds() {
    for seed in 0..40 {
        let (config, jobs, _) = plan_random(seed);
        assert_daily_cap(seed, config.max_tasks_per_painter_per_day, &jobs);
    }
}

#[test]
fn blocks_fit_the_workday() {
    let open = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
    let close = NaiveTime::from_hms_opt(15, 0, 0).unwrap();
    for seed in 0..40 {
        let (_, jobs, report) = plan_random(seed);
        for block in jobs.iter().flat_map(|j| j.plan.iter().flat_map(|p| &p.blocks)) {
            let minutes = block.duration_minutes();
            assert!(minutes >= 15 && minutes % 15 == 0, "seed {seed}: {block:?}");
            assert_eq!(block.start.date(), block.end.date());
            assert!(block.start.time() >= open && block.end.time() <= close);
            assert!(block.start.date() >= report.start_date);
        }
    }
}

#[test]
fn every_ready_job_is_accounted_for() {
    for seed in 0..40 {
        let (_, jobs, report) = plan_random(seed);
        assert_eq!(report.planned_count() + report.unscheduled.len(), jobs.len());
        for id in &report.unscheduled {
            let job = jobs.iter().find(|j| &j.id == id).unwrap();
            assert!(job.plan.is_none());
            assert!(!job.warnings.is_empty());
        }
    }
}

#[test]
fn planning_is_deterministic() {
    for seed in 0..10 {
        let (_, first_jobs, first_report) = plan_random(seed);
        let (_, second_jobs, second_report) = plan_random(seed);
        assert_eq!(
            serde_json::to_string(&first_jobs).unwrap(),
            serde_json::to_string(&second_jobs).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&first_report).unwrap(),
            serde_json::to_string(&second_report).unwrap()
        );
    }
}

fn store_with(jobs: Vec<Job>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let mut jobs = jobs;
    store.save_jobs(&mut jobs).unwrap();
    store
}

#[test]
fn scenario_same_zone_back_to_back() {
    let received = today().and_hms_opt(8, 0, 0).unwrap();
    let store = store_with(vec![
        Job::new("T1", "Nørregade 4, 8000 Aarhus C", 120, received),
        Job::new("T2", "Søndergade 9, 8000 Aarhus C", 180, received + TimeDelta::hours(1)),
    ]);
    let report = run_planning_pass(&*store, &PlannerConfig::default(), today()).unwrap();

    assert_eq!(report.zone_assignment.home_painter("8000"), Some("PAINTER_1"));
    let t1 = store.get_job("T1").unwrap().plan.unwrap();
    let t2 = store.get_job("T2").unwrap().plan.unwrap();
    assert_eq!(t1.blocks[0].slot(), TimeSlot::new(at(0, 7, 0), at(0, 9, 0)));
    assert_eq!(t2.blocks[0].slot(), TimeSlot::new(at(0, 9, 0), at(0, 12, 0)));
    assert_eq!(t1.blocks[0].label, t2.blocks[0].label);
}

#[test]
fn scenario_carpenter_then_painter() {
    let received = today().and_hms_opt(8, 0, 0).unwrap();
    let store = store_with(vec![Job::new("T1", "8000", 270, received).with_carpentry(90)]);
    run_planning_pass(&*store, &PlannerConfig::default(), today()).unwrap();

    let plan = store.get_job("T1").unwrap().plan.unwrap();
    let carpenter: Vec<_> = plan.blocks_of(ResourceKind::Carpenter).collect();
    assert_eq!(carpenter.len(), 1);
    assert_eq!(carpenter[0].duration_minutes(), 90);
    let painter_start = plan.blocks_of(ResourceKind::Painter).map(|b| b.start).min();
    assert_eq!(painter_start, Some(carpenter[0].end));
}

/// Plans one job with carpenter 07:00-08:30 and painter 08:30-13:00.
fn planned_desk() -> (Arc<MemoryStore>, ChangeDesk) {
    let received = today().and_hms_opt(8, 0, 0).unwrap();
    let store = store_with(vec![Job::new("T1", "8000", 270, received).with_carpentry(90)]);
    run_planning_pass(&*store, &PlannerConfig::default(), today()).unwrap();
    let desk = ChangeDesk::new(store.clone(), Arc::new(MemoryNotifier::new()));
    (store, desk)
}

#[test]
fn scenario_conflicting_change_waits_for_arbiter() {
    let (store, desk) = planned_desk();
    let before = store.get_job("T1").unwrap();

    // Painter 08:00-09:00 collides with carpentry until 08:30.
    let outcome = desk
        .propose_change("T1", ResourceKind::Painter, at(0, 8, 0), 60)
        .unwrap();
    let ProposalOutcome::Pending { pending_id } = outcome else {
        panic!("expected a pending change, got {outcome:?}");
    };
    assert_eq!(store.get_job("T1").unwrap(), before);

    desk.approve(pending_id).unwrap();
    let plan = store.get_job("T1").unwrap().plan.unwrap();
    let painter: Vec<_> = plan.blocks_of(ResourceKind::Painter).map(|b| b.slot()).collect();
    assert_eq!(painter, vec![TimeSlot::new(at(0, 8, 0), at(0, 9, 0))]);
    assert!(desk.list_pending(Some(ChangeStatus::Pending)).unwrap().is_empty());
}

#[test]
fn scenario_clear_change_applies() {
    let (store, desk) = planned_desk();
    let outcome = desk
        .propose_change("T1", ResourceKind::Painter, at(0, 9, 0), 60)
        .unwrap();
    assert_eq!(outcome, ProposalOutcome::Applied);

    let plan = store.get_job("T1").unwrap().plan.unwrap();
    let painter: Vec<_> = plan.blocks_of(ResourceKind::Painter).map(|b| b.slot()).collect();
    assert_eq!(painter, vec![TimeSlot::new(at(0, 9, 0), at(0, 10, 0))]);
}

#[test]
fn scenario_deadline_missed_still_scheduled() {
    let received = today().and_hms_opt(8, 0, 0).unwrap();
    let store = store_with(vec![
        Job::new("T1", "8000", 480, received),
        Job::new("T2", "8000", 120, received + TimeDelta::hours(1))
            .with_deadline(at(0, 0, 0).date()),
    ]);
    let config = PlannerConfig {
        num_painters: 1,
        ..PlannerConfig::default()
    };
    let report = run_planning_pass(&*store, &config, today()).unwrap();

    let t2 = store.get_job("T2").unwrap();
    assert!(t2.is_planned());
    assert!(matches!(
        t2.warnings.as_slice(),
        [PlanWarning::DeadlineMissed { .. }]
    ));
    let start = t2.plan.unwrap().first_start().unwrap();
    assert_eq!(start, at(1, 7, 0));
    assert_eq!(report.kpi.deadline_misses, 1);
}

#[test]
fn separate_store_handles_keep_every_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let received = today().and_hms_opt(8, 0, 0).unwrap();
    let config = PlannerConfig {
        num_painters: 4,
        ..PlannerConfig::default()
    };

    let mut jobs: Vec<Job> = (0..8)
        .map(|i| Job::new(format!("T{i}"), format!("{} By", 1000 + i), 60, received))
        .collect();
    JsonFileStore::new(&path).save_jobs(&mut jobs).unwrap();
    run_planning_pass(&JsonFileStore::new(&path), &config, today()).unwrap();

    // One desk and one store handle per thread, as separate processes would.
    std::thread::scope(|scope| {
        for i in 0..8u32 {
            let path = path.clone();
            scope.spawn(move || {
                let store = Arc::new(JsonFileStore::new(path));
                let desk = ChangeDesk::new(store, Arc::new(MemoryNotifier::new()));
                let outcome = desk
                    .propose_change(&format!("T{i}"), ResourceKind::Painter, at(2, 7 + i, 0), 30)
                    .unwrap();
                assert_eq!(outcome, ProposalOutcome::Applied);
            });
        }
    });

    let store = JsonFileStore::new(&path);
    for i in 0..8u32 {
        let job = store.get_job(&format!("T{i}")).unwrap();
        assert_eq!(job.version, 3, "T{i} lost a write");
        assert_eq!(job.status, JobStatus::Planned);
        let painter: Vec<_> = job
            .plan
            .unwrap()
            .blocks_of(ResourceKind::Painter)
            .map(|b| b.slot())
            .collect();
        assert_eq!(painter, vec![TimeSlot::new(at(2, 7 + i, 0), at(2, 7 + i, 30))]);
    }
}

#[test]
fn strict_refusal_keeps_calendar_free_for_next_job() {
    let received = today().and_hms_opt(8, 0, 0).unwrap();
    let config = PlannerConfig {
        num_painters: 1,
        max_tasks_per_painter_per_day: 1,
        deadline_policy: DeadlinePolicy::Strict,
        ..PlannerConfig::default()
    };
    let store = store_with(vec![
        Job::new("T1", "8000", 480, received),
        Job::new("T2", "8000", 270, received + TimeDelta::hours(1))
            .with_carpentry(90)
            .with_deadline(at(0, 0, 0).date()),
        Job::new("T3", "8000", 270, received + TimeDelta::hours(2)).with_carpentry(90),
    ]);
    let report = run_planning_pass(&*store, &config, today()).unwrap();

    assert_eq!(report.unscheduled, vec!["T2"]);
    // T2 booked nothing, so T3 gets the carpenter from the start of the day.
    let t3 = store.get_job("T3").unwrap().plan.unwrap();
    let carpenter: Vec<_> = t3.blocks_of(ResourceKind::Carpenter).map(|b| b.slot()).collect();
    assert_eq!(carpenter, vec![TimeSlot::new(at(0, 7, 0), at(0, 8, 30))]);
}
