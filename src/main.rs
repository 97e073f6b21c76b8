use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use log::info;

use painter_planner::arbitration::{ChangeDesk, LogNotifier, ProposalOutcome};
use painter_planner::cli::{Cli, Command};
use painter_planner::config::PlannerConfig;
use painter_planner::export;
use painter_planner::models::{ChangeStatus, PlanWarning};
use painter_planner::pipeline::run_planning_pass;
use painter_planner::store::{JobStore, JsonFileStore};

fn setup_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let config =
        PlannerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let store = Arc::new(JsonFileStore::new(&cli.store));
    info!("painter-planner using store {}", cli.store.display());

    match cli.command {
        Command::Plan {
            today,
            ics,
            preview,
        } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let report = run_planning_pass(&*store, &config, today)
                .context("Planning pass failed")?;

            println!(
                "Planned {} jobs from {} ({} zones)",
                report.planned_count(),
                report.start_date,
                report.zone_assignment.zone_count()
            );
            for zone in &report.zone_assignment.zones {
                println!(
                    "  zone {:<8} {:>5} min  {:<10} {}",
                    zone.zone,
                    zone.total_minutes,
                    zone.painter_id.as_deref().unwrap_or("-"),
                    zone.job_ids.join(", ")
                );
            }
            for issue in &report.issues {
                match &issue.warning {
                    PlanWarning::DeadlineMissed {
                        resource_id,
                        deadline,
                        earliest_start,
                    } => println!(
                        "  ! {}: {resource_id} starts {earliest_start}, after deadline {deadline}",
                        issue.job_id
                    ),
                    PlanWarning::Unplaceable {
                        resource_id,
                        attempts,
                    } => println!(
                        "  ! {}: {resource_id} not placed after {attempts} attempts",
                        issue.job_id
                    ),
                }
            }
            if !report.unscheduled.is_empty() {
                println!("Unscheduled: {}", report.unscheduled.join(", "));
            }
            println!(
                "On time: {:.0}%, max lateness {} days",
                report.kpi.on_time_rate * 100.0,
                report.kpi.max_lateness_days
            );

            if preview {
                let jobs = store.load_jobs().context("Failed to reload jobs")?;
                let planned: Vec<_> = jobs
                    .into_iter()
                    .filter(|j| report.plans.iter().any(|p| p.job_id == j.id))
                    .collect();
                print!("{}", export::render_preview(&planned));
            }

            if let Some(path) = ics {
                let content = export::render_ics(&report.events, Utc::now().naive_utc());
                fs::write(&path, content)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Wrote {} events to {}", report.events.len(), path.display());
            }
        }
        Command::Propose {
            job,
            resource,
            start,
            minutes,
        } => {
            let desk = ChangeDesk::new(store, Arc::new(LogNotifier));
            match desk
                .propose_change(&job, resource, start, minutes)
                .with_context(|| format!("Failed to propose change for job {job}"))?
            {
                ProposalOutcome::Applied => println!("Applied: {job} {resource} moved to {start}"),
                ProposalOutcome::Pending { pending_id } => {
                    println!("Conflict: pending change {pending_id} awaits approval")
                }
            }
        }
        Command::Pending { all } => {
            let desk = ChangeDesk::new(store, Arc::new(LogNotifier));
            let filter = (!all).then_some(ChangeStatus::Pending);
            let changes = desk.list_pending(filter)?;
            if changes.is_empty() {
                println!("No pending changes");
            }
            for c in changes {
                println!(
                    "{:>4}  {:<9} {:<10} {:<10} {} ({} min)  vs {}",
                    c.id,
                    c.status,
                    c.request.job_id,
                    c.request.kind,
                    c.request.new_start,
                    c.request.duration_minutes,
                    c.conflicting_label
                );
            }
        }
        Command::Approve { id } => {
            let desk = ChangeDesk::new(store, Arc::new(LogNotifier));
            let change = desk
                .approve(id)
                .with_context(|| format!("Failed to approve change {id}"))?;
            println!(
                "Approved {id}: {} {} moved to {}",
                change.request.job_id, change.request.kind, change.request.new_start
            );
        }
        Command::Reject { id } => {
            let desk = ChangeDesk::new(store, Arc::new(LogNotifier));
            desk.reject(id)
                .with_context(|| format!("Failed to reject change {id}"))?;
            println!("Rejected {id}");
        }
    }

    Ok(())
}
