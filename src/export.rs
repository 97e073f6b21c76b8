//! Calendar export.
//!
//! Flattens plans into one event per block and renders them as an
//! iCalendar (RFC 5545) document or a plain-text preview. Output is
//! deterministic: UIDs are derived from the job id and block position, and
//! the DTSTAMP is supplied by the caller.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::Job;

const ICS_DATETIME: &str = "%Y%m%dT%H%M%S";
const PRODID: &str = "-//painter-planner//EN";

/// One calendar entry for one plan block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Block label, e.g. `PAINTER (PAINTER_2)`.
    pub title: String,
    /// Block start.
    pub start: NaiveDateTime,
    /// Block end.
    pub end: NaiveDateTime,
    /// Job address.
    pub location: String,
    /// Job and zone details.
    pub description: String,
    /// Owning job.
    pub job_id: String,
}

/// Events for every block of `job`'s plan, in block order.
pub fn job_events(job: &Job) -> Vec<CalendarEvent> {
    let Some(plan) = &job.plan else {
        return Vec::new();
    };
    plan.blocks
        .iter()
        .map(|block| CalendarEvent {
            title: block.label.clone(),
            start: block.start,
            end: block.end,
            location: job.address.clone(),
            description: format!("Job: {}\nZone: {}", job.id, plan.zone),
            job_id: job.id.clone(),
        })
        .collect()
}

/// Events for all planned jobs.
pub fn calendar_events(jobs: &[Job]) -> Vec<CalendarEvent> {
    jobs.iter().flat_map(job_events).collect()
}

/// Renders `events` as a VCALENDAR document stamped with `stamp`.
pub fn render_ics(events: &[CalendarEvent], stamp: NaiveDateTime) -> String {
    let mut out = String::new();
    let mut line = |s: &str| {
        out.push_str(s);
        out.push_str("\r\n");
    };

    line("BEGIN:VCALENDAR");
    line("VERSION:2.0");
    line(&format!("PRODID:{PRODID}"));
    line("CALSCALE:GREGORIAN");

    let dtstamp = stamp.format(ICS_DATETIME).to_string();
    let mut seq_by_job: HashMap<&str, usize> = HashMap::new();

    for event in events {
        let seq = seq_by_job.entry(event.job_id.as_str()).or_insert(0);
        *seq += 1;

        line("BEGIN:VEVENT");
        line(&format!("UID:{}-{}@painter-planner", event.job_id, seq));
        line(&format!("DTSTAMP:{dtstamp}Z"));
        line(&format!("DTSTART:{}", event.start.format(ICS_DATETIME)));
        line(&format!("DTEND:{}", event.end.format(ICS_DATETIME)));
        line(&format!("SUMMARY:{}", escape_text(&event.title)));
        line(&format!("DESCRIPTION:{}", escape_text(&event.description)));
        line(&format!("LOCATION:{}", escape_text(&event.location)));
        line("END:VEVENT");
    }

    line("END:VCALENDAR");
    out
}

/// Human-readable plan listing, one section per planned job.
pub fn render_preview(jobs: &[Job]) -> String {
    let mut out = String::new();
    for job in jobs {
        let Some(plan) = &job.plan else {
            continue;
        };
        let _ = writeln!(out, "{} | zone {} | {}", job.id, plan.zone, job.address);
        for block in &plan.blocks {
            let _ = writeln!(
                out,
                "    [{}] {} -> {}",
                block.label,
                block.start.format("%Y-%m-%d %H:%M"),
                block.end.format("%H:%M")
            );
        }
        for warning in &job.warnings {
            let _ = writeln!(out, "    ! {}", serde_json::to_string(warning).unwrap_or_default());
        }
        out.push('\n');
    }
    out
}

fn escape_text(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Plan, PlanBlock, ResourceKind, TimeSlot};
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn planned_job() -> Job {
        let mut plan = Plan::new("T1", "8000");
        plan.push(PlanBlock::new(
            ResourceKind::Carpenter,
            "CARPENTER",
            TimeSlot::new(at(7, 0), at(8, 30)),
        ));
        plan.push(PlanBlock::new(
            ResourceKind::Painter,
            "PAINTER (PAINTER_1)",
            TimeSlot::new(at(8, 30), at(13, 0)),
        ));
        let mut job = Job::new("T1", "Søndergade 1, 8000 Aarhus", 270, at(6, 0));
        job.plan = Some(plan);
        job
    }

    #[test]
    fn test_events_per_block() {
        let jobs = vec![planned_job(), Job::new("T2", "8000", 60, at(6, 0))];
        let events = calendar_events(&jobs);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "CARPENTER");
        assert_eq!(events[1].start, at(8, 30));
        assert_eq!(events[1].location, "Søndergade 1, 8000 Aarhus");
        assert!(events[1].description.contains("Zone: 8000"));
    }

    #[test]
    fn test_render_ics() {
        let events = job_events(&planned_job());
        let ics = render_ics(&events, at(12, 0));

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
        assert!(ics.contains("UID:T1-1@painter-planner\r\n"));
        assert!(ics.contains("UID:T1-2@painter-planner\r\n"));
        assert!(ics.contains("DTSTART:20260302T083000\r\n"));
        assert!(ics.contains("DTSTAMP:20260302T120000Z\r\n"));
        // Comma in address and newline in description are escaped
        assert!(ics.contains("LOCATION:Søndergade 1\\, 8000 Aarhus\r\n"));
        assert!(ics.contains("DESCRIPTION:Job: T1\\nZone: 8000\r\n"));
    }

    #[test]
    fn test_render_ics_deterministic() {
        let events = job_events(&planned_job());
        assert_eq!(render_ics(&events, at(12, 0)), render_ics(&events, at(12, 0)));
    }

    #[test]
    fn test_render_preview() {
        let preview = render_preview(&[planned_job()]);
        assert!(preview.starts_with("T1 | zone 8000"));
        assert!(preview.contains("[CARPENTER] 2026-03-02 07:00 -> 08:30"));
    }
}
