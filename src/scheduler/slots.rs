//! Per-resource slot allocation.
//!
//! # Algorithm
//!
//! Starting from a cursor `(day, used)`, fill the current day's remaining
//! capacity, spilling into following days until the requested minutes are
//! covered. An earliest-start constraint on the candidate day pulls the
//! start forward; a constraint on a later day jumps ahead to that day.
//!
//! The computation ([`compute_slots`]) is pure. [`SlotAllocator::peek`]
//! runs it speculatively; [`SlotAllocator::commit`] is the single point
//! where a resource's cursor moves.

use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::models::{
    round_to_granularity, Cursor, Resource, TimeSlot, Workday, SLOT_GRANULARITY_MINUTES,
};

/// Calendar shared by every resource in a planning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkCalendar {
    /// Date of cursor day 0.
    pub start_date: NaiveDate,
    /// Daily working window.
    pub workday: Workday,
}

impl WorkCalendar {
    /// Creates a calendar.
    pub fn new(start_date: NaiveDate, workday: Workday) -> Self {
        Self {
            start_date,
            workday,
        }
    }

    /// Date of cursor day `day`.
    pub fn date_of(&self, day: u32) -> NaiveDate {
        self.start_date
            .checked_add_days(Days::new(u64::from(day)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Cursor day of `date`, or `None` if it precedes the start date.
    pub fn day_of(&self, date: NaiveDate) -> Option<u32> {
        u32::try_from((date - self.start_date).num_days()).ok()
    }
}

/// Result of a slot computation: the blocks and the cursor after them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Contiguous or day-spanning slots covering the requested minutes.
    pub slots: Vec<TimeSlot>,
    /// Resource position after the last slot.
    pub cursor: Cursor,
}

impl Allocation {
    /// Start of the first slot.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.slots.first().map(|s| s.start)
    }

    /// End of the last slot.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.slots.last().map(|s| s.end)
    }

    /// Total minutes covered.
    pub fn total_minutes(&self) -> i64 {
        self.slots.iter().map(|s| s.duration_minutes()).sum()
    }
}

/// Computes the slots for `minutes` of work starting at `from`.
///
/// `minutes` is rounded up to the slot granularity (minimum one slot).
/// Returns no slots if the workday cannot hold a single slot.
pub fn compute_slots(
    calendar: &WorkCalendar,
    from: Cursor,
    minutes: u32,
    earliest: Option<NaiveDateTime>,
) -> Allocation {
    let workday = calendar.workday;
    let capacity = workday.capacity_minutes();
    if capacity < SLOT_GRANULARITY_MINUTES {
        return Allocation {
            slots: Vec::new(),
            cursor: from,
        };
    }

    let mut remaining = round_to_granularity(minutes);
    let mut slots = Vec::new();
    let mut cur = from;

    while remaining > 0 {
        let date = calendar.date_of(cur.day);

        if let Some(earliest) = earliest {
            let earliest_date = earliest.date();
            if earliest_date > date {
                match calendar.day_of(earliest_date) {
                    Some(day) => {
                        cur = Cursor::new(day, 0);
                        continue;
                    }
                    None => break,
                }
            }
            if earliest_date == date {
                let earliest_min = align_up(workday.minutes_into_day(earliest));
                if earliest_min > cur.used_minutes {
                    cur.used_minutes = earliest_min;
                }
            }
        }

        let available = capacity.saturating_sub(cur.used_minutes);
        if available < SLOT_GRANULARITY_MINUTES {
            cur = cur.next_day();
            continue;
        }

        let chunk = remaining.min(available);
        let start = workday.opening(date) + chrono::Duration::minutes(i64::from(cur.used_minutes));
        slots.push(TimeSlot::starting_at(start, chunk));
        cur.used_minutes += chunk;
        remaining -= chunk;

        if cur.used_minutes >= capacity && remaining > 0 {
            cur = cur.next_day();
        }
    }

    Allocation { slots, cursor: cur }
}

fn align_up(minutes: u32) -> u32 {
    minutes.div_ceil(SLOT_GRANULARITY_MINUTES) * SLOT_GRANULARITY_MINUTES
}

/// Slot allocator owning one resource's calendar cursor.
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    resource: Resource,
    calendar: WorkCalendar,
}

impl SlotAllocator {
    /// Wraps a resource.
    pub fn new(resource: Resource, calendar: WorkCalendar) -> Self {
        Self { resource, calendar }
    }

    /// The resource being filled.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Current cursor.
    pub fn cursor(&self) -> Cursor {
        self.resource.cursor
    }

    /// Shared calendar.
    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    /// Computes a candidate allocation without moving the cursor.
    ///
    /// With `extra_days > 0` the candidate starts at the beginning of the
    /// day that many days after the cursor's day.
    pub fn peek(
        &self,
        minutes: u32,
        earliest: Option<NaiveDateTime>,
        extra_days: u32,
    ) -> Allocation {
        compute_slots(
            &self.calendar,
            self.resource.cursor.skip_days(extra_days),
            minutes,
            earliest,
        )
    }

    /// Computes an allocation from the actual cursor and moves the cursor
    /// past it.
    pub fn commit(&mut self, minutes: u32, earliest: Option<NaiveDateTime>) -> Allocation {
        let allocation = compute_slots(&self.calendar, self.resource.cursor, minutes, earliest);
        log::debug!(
            "{}: committed {} min, cursor {:?} -> {:?}",
            self.resource.id,
            allocation.total_minutes(),
            self.resource.cursor,
            allocation.cursor
        );
        self.resource.cursor = allocation.cursor;
        allocation
    }

    /// Moves the cursor past `end` unless it is already there. Times before
    /// the calendar start leave the cursor alone.
    pub fn reserve_until(&mut self, end: NaiveDateTime) {
        let Some(day) = self.calendar.day_of(end.date()) else {
            return;
        };
        let workday = self.calendar.workday;
        let used = align_up(workday.minutes_into_day(end)).min(workday.capacity_minutes());
        let reserved = Cursor::new(day, used);
        if reserved > self.resource.cursor {
            self.resource.cursor = reserved;
        }
    }

    /// Moves the cursor to the start of the next day.
    pub fn advance_day(&mut self) {
        self.resource.cursor = self.resource.cursor.next_day();
    }

    /// Returns the wrapped resource.
    pub fn into_resource(self) -> Resource {
        self.resource
    }
}
