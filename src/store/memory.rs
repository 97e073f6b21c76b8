//! In-memory job store.
//!
//! Holds the whole state behind one mutex. Used by tests and by callers
//! that persist elsewhere.

use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;

use super::{JobStore, StoreSnapshot};
use crate::error::StoreError;
use crate::models::{ChangeRequest, ChangeStatus, Job, PendingChange};

/// In-memory [`JobStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreSnapshot>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `jobs` as given (versions untouched).
    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        Self {
            state: Mutex::new(StoreSnapshot {
                jobs,
                ..StoreSnapshot::default()
            }),
        }
    }

    /// Copy of the full contents.
    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreSnapshot>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl JobStore for MemoryStore {
    fn load_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.lock()?.jobs.clone())
    }

    fn save_jobs(&self, jobs: &mut [Job]) -> Result<(), StoreError> {
        self.lock()?.save_jobs(jobs)
    }

    fn get_job(&self, id: &str) -> Result<Job, StoreError> {
        self.lock()?.get_job(id)
    }

    fn update_job(&self, job: &mut Job) -> Result<(), StoreError> {
        self.lock()?.update_job(job)
    }

    fn insert_pending(
        &self,
        request: ChangeRequest,
        conflicting_label: String,
        created_at: NaiveDateTime,
    ) -> Result<PendingChange, StoreError> {
        Ok(self
            .lock()?
            .insert_pending(request, conflicting_label, created_at))
    }

    fn get_pending(&self, id: u64) -> Result<PendingChange, StoreError> {
        self.lock()?.get_pending(id)
    }

    fn list_pending(&self, status: Option<ChangeStatus>) -> Result<Vec<PendingChange>, StoreError> {
        Ok(self.lock()?.list_pending(status))
    }

    fn transition_pending(
        &self,
        id: u64,
        from: ChangeStatus,
        to: ChangeStatus,
    ) -> Result<PendingChange, StoreError> {
        self.lock()?.transition_pending(id, from, to)
    }
}
