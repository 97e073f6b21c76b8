//! Zone batching and painter load balancing.
//!
//! # Algorithm
//!
//! 1. Group jobs by zone code and sum their estimated minutes.
//! 2. Order zones by descending total (ties: zone code ascending).
//! 3. Give each zone, in that order, to the painter with the least
//!    cumulative load (ties: lowest painter index), then add the zone's
//!    total to that painter's load.
//!
//! Heaviest-first greedy assignment is the LPT rule for identical
//! machines; it is not optimal but keeps late-stage imbalance small.
//!
//! # Reference
//! Graham (1969), "Bounds on Multiprocessing Timing Anomalies"

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::Job;

/// One zone's batch of jobs and its assigned painter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneLoad {
    /// Zone code.
    pub zone: String,
    /// Sum of the jobs' estimated minutes.
    pub total_minutes: u64,
    /// Job IDs in arrival order.
    pub job_ids: Vec<String>,
    /// Home painter; `None` only when no painters exist.
    pub painter_id: Option<String>,
}

/// Output of zone assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneAssignment {
    /// Zones in processing order (heaviest first).
    pub zones: Vec<ZoneLoad>,
    /// Cumulative assigned minutes per painter, in painter order.
    pub painter_load: Vec<(String, u64)>,
}

impl ZoneAssignment {
    /// Home painter of `zone`.
    pub fn home_painter(&self, zone: &str) -> Option<&str> {
        self.zones
            .iter()
            .find(|z| z.zone == zone)
            .and_then(|z| z.painter_id.as_deref())
    }

    /// Number of zones.
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }
}

/// Assigns zones to painters by greedy load balancing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneAssigner;

impl ZoneAssigner {
    /// Creates an assigner.
    pub fn new() -> Self {
        Self
    }

    /// Groups `jobs` into zones and assigns each zone a home painter.
    ///
    /// Pure: does not touch any resource cursor.
    pub fn assign<'a, I>(&self, jobs: I, painter_ids: &[String]) -> ZoneAssignment
    where
        I: IntoIterator<Item = &'a Job>,
    {
        let mut ordered: Vec<&Job> = jobs.into_iter().collect();
        ordered.sort_by(|a, b| {
            a.received_at
                .cmp(&b.received_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut grouped: BTreeMap<String, ZoneLoad> = BTreeMap::new();
        for job in ordered {
            let zone = job.zone_code();
            let load = grouped.entry(zone.clone()).or_insert_with(|| ZoneLoad {
                zone,
                total_minutes: 0,
                job_ids: Vec::new(),
                painter_id: None,
            });
            load.total_minutes += u64::from(job.estimated_total_minutes());
            load.job_ids.push(job.id.clone());
        }

        let mut zones: Vec<ZoneLoad> = grouped.into_values().collect();
        // Stable: equal totals keep zone-code order.
        zones.sort_by(|a, b| b.total_minutes.cmp(&a.total_minutes));

        let mut painter_load: Vec<(String, u64)> =
            painter_ids.iter().map(|id| (id.clone(), 0)).collect();

        for zone in &mut zones {
            let least = painter_load
                .iter_mut()
                .enumerate()
                .min_by_key(|(idx, (_, load))| (*load, *idx))
                .map(|(_, entry)| entry);
            if let Some((painter_id, load)) = least {
                *load += zone.total_minutes;
                zone.painter_id = Some(painter_id.clone());
                log::debug!(
                    "Zone {} ({} min, {} jobs) -> {}",
                    zone.zone,
                    zone.total_minutes,
                    zone.job_ids.len(),
                    painter_id
                );
            }
        }

        ZoneAssignment {
            zones,
            painter_load,
        }
    }
}
