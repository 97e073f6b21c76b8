//! Job model.
//!
//! A job is one customer order: an address, an estimate of painter time,
//! optionally carpentry, and optionally a deadline. Jobs arrive from the
//! intake side already estimated; planning writes their status, plan and
//! warnings.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;

use super::{Plan, PlanWarning};

/// Zone for jobs without a recognisable postal code.
pub const UNKNOWN_ZONE: &str = "UNKNOWN";

/// Minimum estimate charged per job (minutes).
pub const MIN_JOB_MINUTES: u32 = 60;

static POSTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("postcode pattern is valid"));

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

static DMY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[./-](\d{1,2})(?:[./-](\d{2,4}))?$").expect("date pattern is valid")
});

/// Lifecycle of a job through planning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Received, not yet analysed.
    #[default]
    New,
    /// Estimated and ready for planning.
    Analyzed,
    /// Carpenter has been asked for; still waiting on a plan.
    CarpenterRequested,
    /// Plan attached.
    Planned,
}

impl JobStatus {
    /// Whether a planning pass should pick this job up.
    pub fn is_ready(&self) -> bool {
        !matches!(self, JobStatus::Planned)
    }
}

/// A service job to be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: String,
    /// Street address as received.
    #[serde(default)]
    pub address: String,
    /// Zone code. Empty means "derive from address".
    #[serde(default)]
    pub zone: String,
    /// Estimated painter minutes.
    pub painter_minutes: u32,
    /// Estimated carpenter minutes; `Some` marks the job as needing carpentry.
    #[serde(default)]
    pub carpenter_minutes: Option<u32>,
    /// Latest acceptable start date. Malformed text deserialises as `None`.
    #[serde(default, deserialize_with = "lenient_deadline")]
    pub deadline: Option<NaiveDate>,
    /// Arrival time; orders jobs within a zone.
    pub received_at: NaiveDateTime,
    /// Lifecycle state.
    #[serde(default)]
    pub status: JobStatus,
    /// Plan attached by the schedule builder.
    #[serde(default)]
    pub plan: Option<Plan>,
    /// Planning warnings from the last pass.
    #[serde(default)]
    pub warnings: Vec<PlanWarning>,
    /// Optimistic concurrency version, bumped by the store on every write.
    #[serde(default)]
    pub version: u64,
}

impl Job {
    /// Creates a job in `Analyzed` state with its zone derived from `address`.
    pub fn new(
        id: impl Into<String>,
        address: impl Into<String>,
        painter_minutes: u32,
        received_at: NaiveDateTime,
    ) -> Self {
        let address = address.into();
        Self {
            id: id.into(),
            zone: zone_for_address(&address),
            address,
            painter_minutes,
            carpenter_minutes: None,
            deadline: None,
            received_at,
            status: JobStatus::Analyzed,
            plan: None,
            warnings: Vec::new(),
            version: 0,
        }
    }

    /// Marks the job as needing carpentry.
    pub fn with_carpentry(mut self, minutes: u32) -> Self {
        self.carpenter_minutes = Some(minutes);
        self
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Overrides the zone code.
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = zone.into();
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    /// Zone code used for batching.
    pub fn zone_code(&self) -> String {
        if self.zone.trim().is_empty() {
            zone_for_address(&self.address)
        } else {
            self.zone.trim().to_string()
        }
    }

    /// Whether carpentry must precede painting.
    pub fn needs_carpentry(&self) -> bool {
        self.carpenter_minutes.is_some()
    }

    /// Painter minutes with the per-job floor applied.
    pub fn billable_painter_minutes(&self) -> u32 {
        self.painter_minutes.max(MIN_JOB_MINUTES)
    }

    /// Painter plus carpenter minutes, floored, for zone load balancing.
    pub fn estimated_total_minutes(&self) -> u32 {
        self.painter_minutes
            .saturating_add(self.carpenter_minutes.unwrap_or(0))
            .max(MIN_JOB_MINUTES)
    }

    /// Whether the job has a plan attached.
    pub fn is_planned(&self) -> bool {
        self.status == JobStatus::Planned && self.plan.is_some()
    }
}

/// Derives a zone code from an address: its first standalone 4-digit
/// postal code, or [`UNKNOWN_ZONE`].
pub fn zone_for_address(address: &str) -> String {
    POSTCODE_RE
        .captures(address)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_ZONE.to_string())
}

/// Parses deadline text.
///
/// Accepts `YYYY-MM-DD`, `DD.MM.YYYY`, `DD-MM-YY`, `DD/MM/YYYY`, and
/// `DD.MM` (using `default_year`). Returns `None` for anything else,
/// including impossible dates.
pub fn parse_deadline(raw: &str, default_year: i32) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if ISO_DATE_RE.is_match(raw) {
        return NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok();
    }

    let caps = DMY_RE.captures(raw)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year = match caps.get(3) {
        Some(y) => {
            let y: i32 = y.as_str().parse().ok()?;
            if y < 100 {
                y + 2000
            } else {
                y
            }
        }
        None => default_year,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn lenient_deadline<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| parse_deadline(&s, Local::now().year())))
}
