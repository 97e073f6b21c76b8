//! Planner configuration.
//!
//! Read once before a planning pass. Values come from an optional YAML
//! file, then environment variable overrides.

use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::models::Workday;

/// What to do when a painter cannot start before the job's deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlinePolicy {
    /// Record a warning and schedule at the best available slot anyway.
    #[default]
    Advisory,
    /// Record a warning and leave the job unscheduled for manual override.
    Strict,
}

/// Planning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Time of day work begins.
    pub workday_start: NaiveTime,
    /// Time of day work ends.
    pub workday_end: NaiveTime,
    /// Number of painters (`PAINTER_1..n`).
    pub num_painters: usize,
    /// Jobs a painter may start on one day.
    pub max_tasks_per_painter_per_day: u32,
    /// Painters sharing each job.
    pub painters_per_job: usize,
    /// Carpenter minutes as a fraction of painter minutes.
    pub carpenter_ratio: f64,
    /// Days between today and the first plannable day.
    pub plan_start_offset_days: u32,
    /// Day-advance attempts per painter before giving up.
    pub max_placement_attempts: u32,
    /// Deadline handling.
    pub deadline_policy: DeadlinePolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let workday = Workday::default();
        Self {
            workday_start: workday.start,
            workday_end: workday.end,
            num_painters: 6,
            max_tasks_per_painter_per_day: 2,
            painters_per_job: 1,
            carpenter_ratio: 0.33,
            plan_start_offset_days: 1,
            max_placement_attempts: 30,
            deadline_policy: DeadlinePolicy::Advisory,
        }
    }
}

impl PlannerConfig {
    /// Loads the config file if given (defaults otherwise), then applies
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()
    }

    /// Loads a YAML config file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        log::debug!("Loaded planner config from {}", path.display());
        Ok(config)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from a variable lookup. Blank values are ignored.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| -> Option<(&'static str, String)> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        };

        if let Some((name, v)) = get("WORKDAY_START") {
            self.workday_start = parse_env(name, &v, parse_hhmm)?;
        }
        if let Some((name, v)) = get("WORKDAY_END") {
            self.workday_end = parse_env(name, &v, parse_hhmm)?;
        }
        if let Some((name, v)) = get("NUM_PAINTERS") {
            self.num_painters = parse_env(name, &v, |s| s.parse().ok())?;
        }
        if let Some((name, v)) = get("MAX_TASKS_PER_DAY_PER_PAINTER") {
            self.max_tasks_per_painter_per_day = parse_env(name, &v, |s| s.parse().ok())?;
        }
        if let Some((name, v)) = get("PAINTERS_PER_JOB") {
            self.painters_per_job = parse_env(name, &v, |s| s.parse().ok())?;
        }
        if let Some((name, v)) = get("CARPENTER_RATIO_OF_PAINTER") {
            self.carpenter_ratio = parse_env(name, &v, |s| s.parse().ok())?;
        }
        if let Some((name, v)) = get("PLAN_START_OFFSET_DAYS") {
            self.plan_start_offset_days = parse_env(name, &v, |s| s.parse().ok())?;
        }
        Ok(self)
    }

    /// Daily working window.
    pub fn workday(&self) -> Workday {
        Workday::new(self.workday_start, self.workday_end)
    }

    /// First plannable date for a pass run on `today`.
    pub fn plan_start(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_days(Days::new(u64::from(self.plan_start_offset_days)))
            .unwrap_or(today)
    }
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

fn parse_env<T>(
    name: &'static str,
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    parse(value).ok_or_else(|| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}
