//! CLI argument parsing for painter-planner

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::ResourceKind;

#[derive(Parser, Debug)]
#[command(name = "painter-planner")]
#[command(author, version, about = "Zone-balanced planning for painter and carpenter crews", long_about = None)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the JSON job store
    #[arg(short, long, default_value = "jobs.json")]
    pub store: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan every job that is not yet planned
    Plan {
        /// Date the pass runs on (default: today)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Write the plan as an iCalendar file
        #[arg(long)]
        ics: Option<PathBuf>,

        /// Print a per-job plan listing
        #[arg(long)]
        preview: bool,
    },

    /// Report a new time for one resource kind on a planned job
    Propose {
        /// Job ID
        #[arg(long)]
        job: String,

        /// painter or carpenter
        #[arg(long)]
        resource: ResourceKind,

        /// New start, e.g. 2026-03-02T09:00
        #[arg(long, value_parser = parse_datetime)]
        start: NaiveDateTime,

        /// Duration in minutes
        #[arg(long)]
        minutes: u32,
    },

    /// List pending changes
    Pending {
        /// Include approved and rejected changes
        #[arg(long)]
        all: bool,
    },

    /// Approve a pending change
    Approve {
        /// Pending change ID
        id: u64,
    },

    /// Reject a pending change
    Reject {
        /// Pending change ID
        id: u64,
    },
}

/// Accepts `YYYY-MM-DDTHH:MM[:SS]`, with `T` or a space.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s.trim(), f).ok())
        .ok_or_else(|| format!("invalid date-time '{s}', expected YYYY-MM-DDTHH:MM"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("2026-03-02T09:00").unwrap(), expected);
        assert_eq!(parse_datetime("2026-03-02 09:00:00").unwrap(), expected);
        assert!(parse_datetime("tomorrow").is_err());
    }

    #[test]
    fn test_propose_args() {
        let cli = Cli::try_parse_from([
            "painter-planner",
            "--store",
            "x.json",
            "propose",
            "--job",
            "T1",
            "--resource",
            "carpenter",
            "--start",
            "2026-03-02T09:00",
            "--minutes",
            "60",
        ])
        .unwrap();
        match cli.command {
            Command::Propose {
                job,
                resource,
                minutes,
                ..
            } => {
                assert_eq!(job, "T1");
                assert_eq!(resource, ResourceKind::Carpenter);
                assert_eq!(minutes, 60);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_plan_args() {
        let cli = Cli::try_parse_from(["painter-planner", "plan", "--today", "2026-03-01"]).unwrap();
        assert_eq!(cli.store, PathBuf::from("jobs.json"));
        assert!(matches!(
            cli.command,
            Command::Plan { today: Some(_), ics: None, preview: false }
        ));
    }
}
