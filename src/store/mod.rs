//! Job persistence.
//!
//! The planner and the change desk talk to storage only through
//! [`JobStore`]. Writes are guarded by optimistic versioning: every stored
//! job carries a `version`, a write must present the version it read, and
//! a successful write bumps it. Pending changes move between states by
//! compare-and-swap on their status.
//!
//! Two implementations:
//! - [`MemoryStore`]: in-process, for tests and embedding.
//! - [`JsonFileStore`]: one JSON document on disk, replaced atomically.

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{ChangeRequest, ChangeStatus, Job, PendingChange};

/// Storage for jobs and pending changes.
pub trait JobStore: Send + Sync {
    /// All stored jobs, in insertion order.
    fn load_jobs(&self) -> Result<Vec<Job>, StoreError>;

    /// Saves a batch atomically: either every job is written or none is.
    ///
    /// Each job's `version` must equal the stored one (0 for a new job). On
    /// success the versions in `jobs` are bumped to match the store.
    fn save_jobs(&self, jobs: &mut [Job]) -> Result<(), StoreError>;

    /// One job by id.
    fn get_job(&self, id: &str) -> Result<Job, StoreError>;

    /// Compare-and-swap write of one existing job; bumps `job.version`.
    fn update_job(&self, job: &mut Job) -> Result<(), StoreError>;

    /// Stores a new pending change and returns it with its assigned id.
    fn insert_pending(
        &self,
        request: ChangeRequest,
        conflicting_label: String,
        created_at: NaiveDateTime,
    ) -> Result<PendingChange, StoreError>;

    /// One pending change by id.
    fn get_pending(&self, id: u64) -> Result<PendingChange, StoreError>;

    /// Pending changes, optionally filtered by status, in id order.
    fn list_pending(&self, status: Option<ChangeStatus>) -> Result<Vec<PendingChange>, StoreError>;

    /// Moves a pending change from `from` to `to`, failing with
    /// [`StoreError::StateConflict`] if it is not currently in `from`.
    fn transition_pending(
        &self,
        id: u64,
        from: ChangeStatus,
        to: ChangeStatus,
    ) -> Result<PendingChange, StoreError>;
}

/// Full store contents. Both implementations operate on this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Jobs in insertion order.
    #[serde(default)]
    pub jobs: Vec<Job>,
    /// Pending changes in id order.
    #[serde(default)]
    pub pending: Vec<PendingChange>,
    /// Last id handed out.
    #[serde(default)]
    pub last_pending_id: u64,
}

impl StoreSnapshot {
    fn job_index(&self, id: &str) -> Option<usize> {
        self.jobs.iter().position(|j| j.id == id)
    }

    fn stored_version(&self, id: &str) -> u64 {
        self.job_index(id).map(|i| self.jobs[i].version).unwrap_or(0)
    }

    pub(crate) fn save_jobs(&mut self, jobs: &mut [Job]) -> Result<(), StoreError> {
        // Check everything before touching anything.
        for job in jobs.iter() {
            let found = self.stored_version(&job.id);
            if found != job.version {
                return Err(StoreError::VersionConflict {
                    job_id: job.id.clone(),
                    expected: job.version,
                    found,
                });
            }
        }
        for job in jobs.iter_mut() {
            job.version += 1;
            match self.job_index(&job.id) {
                Some(i) => self.jobs[i] = job.clone(),
                None => self.jobs.push(job.clone()),
            }
        }
        Ok(())
    }

    pub(crate) fn get_job(&self, id: &str) -> Result<Job, StoreError> {
        self.job_index(id)
            .map(|i| self.jobs[i].clone())
            .ok_or_else(|| StoreError::JobNotFound(id.to_string()))
    }

    pub(crate) fn update_job(&mut self, job: &mut Job) -> Result<(), StoreError> {
        let idx = self
            .job_index(&job.id)
            .ok_or_else(|| StoreError::JobNotFound(job.id.clone()))?;
        let found = self.jobs[idx].version;
        if found != job.version {
            return Err(StoreError::VersionConflict {
                job_id: job.id.clone(),
                expected: job.version,
                found,
            });
        }
        job.version += 1;
        self.jobs[idx] = job.clone();
        Ok(())
    }

    pub(crate) fn insert_pending(
        &mut self,
        request: ChangeRequest,
        conflicting_label: String,
        created_at: NaiveDateTime,
    ) -> PendingChange {
        self.last_pending_id += 1;
        let change = PendingChange {
            id: self.last_pending_id,
            request,
            conflicting_label,
            status: ChangeStatus::Pending,
            created_at,
        };
        self.pending.push(change.clone());
        change
    }

    pub(crate) fn get_pending(&self, id: u64) -> Result<PendingChange, StoreError> {
        self.pending
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StoreError::PendingNotFound(id))
    }

    pub(crate) fn list_pending(&self, status: Option<ChangeStatus>) -> Vec<PendingChange> {
        self.pending
            .iter()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect()
    }

    pub(crate) fn transition_pending(
        &mut self,
        id: u64,
        from: ChangeStatus,
        to: ChangeStatus,
    ) -> Result<PendingChange, StoreError> {
        let change = self
            .pending
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::PendingNotFound(id))?;
        if change.status != from {
            return Err(StoreError::StateConflict {
                id,
                expected: from,
                actual: change.status,
            });
        }
        change.status = to;
        Ok(change.clone())
    }
}

/// Behaviour every [`JobStore`] must show, run against each implementation.
#[cfg(test)]
pub(crate) mod conformance {
    use super::*;
    use crate::models::ResourceKind;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    pub fn batch_save_bumps_versions(store: &dyn JobStore) {
        let mut jobs = vec![
            Job::new("T1", "8000", 120, at(8)),
            Job::new("T2", "5000", 120, at(9)),
        ];
        store.save_jobs(&mut jobs).unwrap();
        assert_eq!(jobs[0].version, 1);

        let loaded = store.load_jobs().unwrap();
        assert_eq!(loaded, jobs);
    }

    pub fn batch_save_is_all_or_nothing(store: &dyn JobStore) {
        let mut jobs = vec![
            Job::new("T1", "8000", 120, at(8)),
            Job::new("T2", "5000", 120, at(9)),
        ];
        store.save_jobs(&mut jobs).unwrap();

        // T2 is stale; T1's change must not land either.
        let mut batch = jobs.clone();
        batch[0].painter_minutes = 999;
        batch[1].version = 0;
        let err = store.save_jobs(&mut batch).unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { ref job_id, .. } if job_id == "T2"));
        assert_eq!(batch[0].version, 1);
        assert_eq!(store.get_job("T1").unwrap().painter_minutes, 120);
    }

    pub fn update_is_compare_and_swap(store: &dyn JobStore) {
        let mut jobs = vec![Job::new("T1", "8000", 120, at(8))];
        store.save_jobs(&mut jobs).unwrap();

        let mut first = store.get_job("T1").unwrap();
        let mut second = first.clone();
        first.painter_minutes = 180;
        store.update_job(&mut first).unwrap();
        assert_eq!(first.version, 2);

        second.painter_minutes = 240;
        let err = store.update_job(&mut second).unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { expected: 1, found: 2, .. }));
        assert_eq!(store.get_job("T1").unwrap().painter_minutes, 180);

        let mut ghost = Job::new("nope", "8000", 60, at(8));
        assert!(matches!(
            store.update_job(&mut ghost),
            Err(StoreError::JobNotFound(_))
        ));
    }

    pub fn pending_lifecycle(store: &dyn JobStore) {
        let req = ChangeRequest::new("T1", ResourceKind::Painter, at(9), 60);
        let a = store.insert_pending(req.clone(), "CARPENTER".into(), at(12)).unwrap();
        let b = store.insert_pending(req, "CARPENTER".into(), at(13)).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(a.status, ChangeStatus::Pending);

        let approved = store
            .transition_pending(a.id, ChangeStatus::Pending, ChangeStatus::Approved)
            .unwrap();
        assert_eq!(approved.status, ChangeStatus::Approved);

        let err = store
            .transition_pending(a.id, ChangeStatus::Pending, ChangeStatus::Rejected)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::StateConflict { actual: ChangeStatus::Approved, .. }
        ));

        let open = store.list_pending(Some(ChangeStatus::Pending)).unwrap();
        assert_eq!(open.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(store.list_pending(None).unwrap().len(), 2);
        assert!(matches!(store.get_pending(99), Err(StoreError::PendingNotFound(99))));
    }
}
