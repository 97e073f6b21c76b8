//! Workday and time slot models.
//!
//! Defines the daily working window shared by every resource and the
//! concrete calendar intervals produced by slot allocation.
//!
//! # Time Model
//! Slots carry naive local timestamps (`chrono::NaiveDateTime`). Daily
//! capacity is expressed in minutes-of-day relative to the workday start.
//! All durations are whole minutes at 15-minute granularity.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Scheduling granularity (minutes). Also the minimum block length.
pub const SLOT_GRANULARITY_MINUTES: u32 = 15;

/// Rounds a duration up to the slot granularity, never below one slot.
pub fn round_to_granularity(minutes: u32) -> u32 {
    let g = SLOT_GRANULARITY_MINUTES;
    minutes.max(g).div_ceil(g) * g
}

/// A time interval [start, end).
///
/// Half-open interval: includes start, excludes end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot {
    /// Interval start (inclusive).
    pub start: NaiveDateTime,
    /// Interval end (exclusive).
    pub end: NaiveDateTime,
}

impl TimeSlot {
    /// Creates a new slot.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Creates a slot from a start and a length in minutes. The end is
    /// clamped at the largest representable time.
    pub fn starting_at(start: NaiveDateTime, minutes: u32) -> Self {
        let end = start
            .checked_add_signed(Duration::minutes(i64::from(minutes)))
            .unwrap_or(NaiveDateTime::MAX);
        Self::new(start, end)
    }

    /// Length of this slot in minutes.
    #[inline]
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether a timestamp falls within this slot.
    #[inline]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start && at < self.end
    }

    /// Whether two slots overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Daily working window, e.g. 07:00-15:00.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Workday {
    /// Time of day work begins.
    pub start: NaiveTime,
    /// Time of day work ends.
    pub end: NaiveTime,
}

impl Workday {
    /// Creates a new workday window.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Minutes of capacity per day. Zero if `end` is not after `start`.
    pub fn capacity_minutes(&self) -> u32 {
        let minutes = (self.end - self.start).num_minutes();
        u32::try_from(minutes).unwrap_or(0)
    }

    /// Timestamp at which work begins on `date`.
    pub fn opening(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.start)
    }

    /// Timestamp at which work ends on `date`.
    pub fn closing(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.end)
    }

    /// Minutes elapsed since the opening of `at`'s date, clamped at zero.
    pub fn minutes_into_day(&self, at: NaiveDateTime) -> u32 {
        let minutes = (at - self.opening(at.date())).num_minutes();
        // A partial minute still occupies the slot it falls in.
        let minutes = if at.second() > 0 { minutes + 1 } else { minutes };
        u32::try_from(minutes).unwrap_or(0)
    }
}

impl Default for Workday {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(15, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}
