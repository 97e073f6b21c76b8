//! Change desk: applies reported time changes or routes them to an arbiter.
//!
//! # State machine
//!
//! ```text
//! propose ─┬─ no overlap ──> plan rewritten (Applied)
//!          └─ overlap ─────> PendingChange(PENDING)
//!                              ├─ approve ─> APPROVED, plan rewritten
//!                              └─ reject ──> REJECTED, plan untouched
//! ```
//!
//! # Concurrency
//!
//! Mutations of one job are serialised by a per-job lock, and decisions on
//! one pending change by a per-id lock (always taken before the job lock).
//! The store's version check catches writers outside this process; such a
//! conflict is returned, never overwritten.

use std::hash::Hash;
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDateTime};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::detector::find_conflict;
use super::notify::{Notice, Notifier};
use crate::error::{ArbitrationError, StoreError};
use crate::models::{ChangeRequest, ChangeStatus, Job, PendingChange, ResourceKind};
use crate::store::JobStore;

/// Result of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProposalOutcome {
    /// No collision; the plan was rewritten.
    Applied,
    /// Collision; a pending change awaits a decision.
    Pending { pending_id: u64 },
}

/// Lazily created mutex per key. An entry is dropped again once no caller
/// holds or waits on it.
#[derive(Debug)]
struct KeyedLocks<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Runs `f` while holding the lock for `key`.
    fn with<T, E>(&self, key: &K, f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let lock = self.locks.entry(key.clone()).or_default().value().clone();
        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(StoreError::Poisoned.into()),
        };
        drop(lock);
        self.locks.remove_if(key, |_, l| Arc::strong_count(l) == 1);
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// The arbitration front end over a [`JobStore`].
pub struct ChangeDesk {
    store: Arc<dyn JobStore>,
    notifier: Arc<dyn Notifier>,
    job_locks: KeyedLocks<String>,
    pending_locks: KeyedLocks<u64>,
    clock: Clock,
}

impl ChangeDesk {
    /// Creates a desk using local wall-clock time for pending changes.
    pub fn new(store: Arc<dyn JobStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            job_locks: KeyedLocks::new(),
            pending_locks: KeyedLocks::new(),
            clock: Box::new(|| Local::now().naive_local()),
        }
    }

    /// Overrides the clock that stamps new pending changes.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// Proposes moving `kind`'s work on a job to `[new_start, new_start + duration)`.
    pub fn propose_change(
        &self,
        job_id: &str,
        kind: ResourceKind,
        new_start: NaiveDateTime,
        duration_minutes: u32,
    ) -> Result<ProposalOutcome, ArbitrationError> {
        if duration_minutes == 0 {
            return Err(ArbitrationError::InvalidDuration);
        }
        let request = ChangeRequest::new(job_id, kind, new_start, duration_minutes);
        if request.end().is_none() {
            return Err(ArbitrationError::OutOfRange(new_start));
        }

        let key = request.job_id.clone();
        self.job_locks.with(&key, || self.propose_locked(request))
    }

    fn propose_locked(&self, request: ChangeRequest) -> Result<ProposalOutcome, ArbitrationError> {
        let job_id = request.job_id.clone();
        let kind = request.kind;
        let mut job = self.store.get_job(&job_id)?;
        let plan = job
            .plan
            .as_ref()
            .ok_or_else(|| ArbitrationError::JobNotPlanned(job_id.clone()))?;
        if !plan.has_kind(kind) {
            return Err(ArbitrationError::NoBlocksForKind { job_id, kind });
        }

        if let Some(block) = find_conflict(plan, &request) {
            let label = block.label.clone();
            let slot = request.slot();
            let pending = self
                .store
                .insert_pending(request, label.clone(), (self.clock)())?;
            log::warn!(
                "Job {job_id}: {kind} change collides with {label}, pending change {}",
                pending.id
            );
            self.notifier.notify(&Notice::ConflictRaised {
                pending_id: pending.id,
                job_id,
                kind,
                slot,
                conflicting_label: label,
            });
            return Ok(ProposalOutcome::Pending {
                pending_id: pending.id,
            });
        }

        self.apply(&mut job, &request)?;
        Ok(ProposalOutcome::Applied)
    }

    /// Pending changes, optionally filtered by status.
    pub fn list_pending(
        &self,
        status: Option<ChangeStatus>,
    ) -> Result<Vec<PendingChange>, ArbitrationError> {
        Ok(self.store.list_pending(status)?)
    }

    /// Approves a pending change and rewrites the job's plan.
    ///
    /// The change is claimed first; if the plan cannot be rewritten the
    /// claim is released and the change stays pending.
    pub fn approve(&self, id: u64) -> Result<PendingChange, ArbitrationError> {
        self.pending_locks.with(&id, || {
            let change = self.store.get_pending(id)?;
            if change.status.is_terminal() {
                return Err(ArbitrationError::AlreadyResolved {
                    id,
                    status: change.status,
                });
            }
            self.job_locks
                .with(&change.request.job_id, || self.approve_locked(id))
        })
    }

    /// Claims and applies pending change `id`. Caller holds both locks.
    fn approve_locked(&self, id: u64) -> Result<PendingChange, ArbitrationError> {
        let approved = self.resolve(id, ChangeStatus::Approved)?;
        let rewrite = self
            .store
            .get_job(&approved.request.job_id)
            .map_err(ArbitrationError::from)
            .and_then(|mut job| self.apply(&mut job, &approved.request));

        if let Err(e) = rewrite {
            log::warn!("Pending change {id}: plan rewrite failed ({e}), releasing claim");
            if let Err(revert) =
                self.store
                    .transition_pending(id, ChangeStatus::Approved, ChangeStatus::Pending)
            {
                log::error!("Pending change {id}: could not release claim: {revert}");
            }
            return Err(e);
        }

        log::info!("Pending change {id} approved");
        Ok(approved)
    }

    /// Rejects a pending change. The plan is not touched.
    pub fn reject(&self, id: u64) -> Result<PendingChange, ArbitrationError> {
        self.pending_locks.with(&id, || {
            let rejected = self.resolve(id, ChangeStatus::Rejected)?;
            log::info!("Pending change {id} rejected");
            Ok(rejected)
        })
    }

    fn resolve(&self, id: u64, to: ChangeStatus) -> Result<PendingChange, ArbitrationError> {
        self.store
            .transition_pending(id, ChangeStatus::Pending, to)
            .map_err(|e| match e {
                StoreError::StateConflict { actual, .. } => {
                    ArbitrationError::AlreadyResolved { id, status: actual }
                }
                other => other.into(),
            })
    }

    /// Rewrites `request.kind`'s blocks, saves the job and notifies the
    /// other resources. Caller holds the job lock.
    fn apply(&self, job: &mut Job, request: &ChangeRequest) -> Result<(), ArbitrationError> {
        let slot = request.slot();
        let plan = job
            .plan
            .as_mut()
            .ok_or_else(|| ArbitrationError::JobNotPlanned(job.id.clone()))?;
        if plan.reschedule_kind(request.kind, slot) == 0 {
            return Err(ArbitrationError::NoBlocksForKind {
                job_id: job.id.clone(),
                kind: request.kind,
            });
        }

        let mut recipients: Vec<String> = plan
            .blocks
            .iter()
            .filter(|b| b.kind != request.kind)
            .map(|b| b.label.clone())
            .collect();
        recipients.dedup();

        self.store.update_job(job)?;
        log::info!(
            "Job {}: {} moved to {} - {}",
            job.id,
            request.kind,
            slot.start,
            slot.end
        );
        self.notifier.notify(&Notice::ScheduleChanged {
            job_id: job.id.clone(),
            changed: request.kind,
            slot,
            recipients,
        });
        Ok(())
    }
}
