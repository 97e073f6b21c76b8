//! Input validation for planning passes.
//!
//! Checks structural integrity of the planner configuration and the job
//! batch before any cursor moves. Detects:
//! - Duplicate or empty job IDs
//! - Workdays that are empty or not aligned to the slot granularity
//! - Resource counts and limits that would make placement impossible
//!
//! All problems are collected; validation never stops at the first one.

use std::collections::HashSet;

use crate::config::PlannerConfig;
use crate::models::{Job, SLOT_GRANULARITY_MINUTES};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two jobs share the same ID.
    DuplicateId,
    /// A job has a blank ID.
    EmptyId,
    /// Workday end is not after its start, or not slot-aligned.
    InvalidWorkday,
    /// A count or limit is out of range.
    InvalidLimit,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates planner configuration.
///
/// Checks:
/// 1. Workday end after start
/// 2. Workday length is a multiple of the slot granularity
/// 3. At least one painter, and a positive daily task cap
/// 4. `1 <= painters_per_job <= num_painters`
/// 5. Carpenter ratio is finite and non-negative
/// 6. At least one placement attempt
pub fn validate_config(config: &PlannerConfig) -> ValidationResult {
    let mut errors = Vec::new();

    let capacity = config.workday().capacity_minutes();
    if capacity == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidWorkday,
            format!(
                "Workday end {} must be after start {}",
                config.workday_end, config.workday_start
            ),
        ));
    } else if capacity % SLOT_GRANULARITY_MINUTES != 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidWorkday,
            format!(
                "Workday length {capacity} min is not a multiple of {SLOT_GRANULARITY_MINUTES} min"
            ),
        ));
    }

    if config.num_painters == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidLimit,
            "At least one painter is required",
        ));
    }

    if config.max_tasks_per_painter_per_day == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidLimit,
            "Max tasks per painter per day must be at least 1",
        ));
    }

    if config.painters_per_job == 0 || config.painters_per_job > config.num_painters.max(1) {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidLimit,
            format!(
                "Painters per job ({}) must be between 1 and the number of painters ({})",
                config.painters_per_job, config.num_painters
            ),
        ));
    }

    if !config.carpenter_ratio.is_finite() || config.carpenter_ratio < 0.0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidLimit,
            format!("Carpenter ratio {} must be a non-negative number", config.carpenter_ratio),
        ));
    }

    if config.max_placement_attempts == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidLimit,
            "Max placement attempts must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a batch of jobs.
pub fn validate_jobs(jobs: &[Job]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();

    for job in jobs {
        if job.id.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyId,
                format!("Job at {} has an empty ID", job.received_at),
            ));
            continue;
        }
        if !ids.insert(job.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate job ID: {}", job.id),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates configuration and jobs together, merging all errors.
pub fn validate_input(config: &PlannerConfig, jobs: &[Job]) -> ValidationResult {
    let mut errors = validate_config(config).err().unwrap_or_default();
    errors.extend(validate_jobs(jobs).err().unwrap_or_default());
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    fn received() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_valid_input() {
        let jobs = vec![
            Job::new("T1", "8000 Aarhus", 120, received()),
            Job::new("T2", "8000 Aarhus", 240, received()),
        ];
        assert!(validate_input(&PlannerConfig::default(), &jobs).is_ok());
    }

    #[test]
    fn test_duplicate_job_id() {
        let jobs = vec![
            Job::new("T1", "8000 Aarhus", 120, received()),
            Job::new("T1", "5000 Odense", 120, received()),
        ];
        let errors = validate_jobs(&jobs).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId));
    }

    #[test]
    fn test_empty_job_id() {
        let jobs = vec![Job::new("  ", "8000 Aarhus", 120, received())];
        let errors = validate_jobs(&jobs).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::EmptyId);
    }

    #[test]
    fn test_inverted_workday() {
        let config = PlannerConfig {
            workday_start: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            workday_end: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            ..PlannerConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidWorkday));
    }

    #[test]
    fn test_unaligned_workday() {
        let config = PlannerConfig {
            workday_end: NaiveTime::from_hms_opt(15, 10, 0).unwrap(),
            ..PlannerConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].message.contains("multiple of 15"));
    }

    #[test]
    fn test_painters_per_job_out_of_range() {
        let config = PlannerConfig {
            num_painters: 2,
            painters_per_job: 3,
            ..PlannerConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidLimit));
    }

    #[test]
    fn test_multiple_errors() {
        let config = PlannerConfig {
            num_painters: 0,
            max_tasks_per_painter_per_day: 0,
            carpenter_ratio: f64::NAN,
            max_placement_attempts: 0,
            ..PlannerConfig::default()
        };
        let jobs = vec![
            Job::new("T1", "", 60, received()),
            Job::new("T1", "", 60, received()),
        ];
        let errors = validate_input(&config, &jobs).unwrap_err();
        assert!(errors.len() >= 5);
    }
}
