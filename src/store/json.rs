//! JSON document store.
//!
//! The whole state lives in one pretty-printed document. Every operation
//! holds an OS file lock on a sidecar `<file>.lock` for its full
//! read-modify-write span: shared for reads, exclusive for mutations. This
//! serialises handles in other processes as well as threads.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDateTime;
use fs2::FileExt;
use tempfile::NamedTempFile;

use super::{JobStore, StoreSnapshot};
use crate::error::StoreError;
use crate::models::{ChangeRequest, ChangeStatus, Job, PendingChange};

/// [`JobStore`] backed by a single JSON document.
///
/// Mutations write a sibling temporary file and rename it over the
/// original, so a failed save leaves the previous contents intact. A
/// missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens (lazily) the store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the sidecar lock file.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    fn open_lock(&self) -> Result<File, StoreError> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?)
    }

    fn read(&self) -> Result<StoreSnapshot, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(StoreSnapshot::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreSnapshot::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, snapshot)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        log::debug!("Wrote store {}", self.path.display());
        Ok(())
    }

    fn read_only<R>(
        &self,
        f: impl FnOnce(&StoreSnapshot) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock)?;
        // Released when `lock` is closed.
        f(&self.read()?)
    }

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut StoreSnapshot) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock)?;
        let mut snapshot = self.read()?;
        let result = f(&mut snapshot)?;
        self.write(&snapshot)?;
        Ok(result)
    }
}

impl JobStore for JsonFileStore {
    fn load_jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.read_only(|s| Ok(s.jobs.clone()))
    }

    fn save_jobs(&self, jobs: &mut [Job]) -> Result<(), StoreError> {
        // Versions are bumped on a staged copy so a failed write leaves the
        // caller's jobs consistent with the file.
        let mut staged = jobs.to_vec();
        self.mutate(|s| s.save_jobs(&mut staged))?;
        jobs.clone_from_slice(&staged);
        Ok(())
    }

    fn get_job(&self, id: &str) -> Result<Job, StoreError> {
        self.read_only(|s| s.get_job(id))
    }

    fn update_job(&self, job: &mut Job) -> Result<(), StoreError> {
        let mut staged = job.clone();
        self.mutate(|s| s.update_job(&mut staged))?;
        *job = staged;
        Ok(())
    }

    fn insert_pending(
        &self,
        request: ChangeRequest,
        conflicting_label: String,
        created_at: NaiveDateTime,
    ) -> Result<PendingChange, StoreError> {
        self.mutate(|s| Ok(s.insert_pending(request, conflicting_label, created_at)))
    }

    fn get_pending(&self, id: u64) -> Result<PendingChange, StoreError> {
        self.read_only(|s| s.get_pending(id))
    }

    fn list_pending(&self, status: Option<ChangeStatus>) -> Result<Vec<PendingChange>, StoreError> {
        self.read_only(|s| Ok(s.list_pending(status)))
    }

    fn transition_pending(
        &self,
        id: u64,
        from: ChangeStatus,
        to: ChangeStatus,
    ) -> Result<PendingChange, StoreError> {
        self.mutate(|s| s.transition_pending(id, from, to))
    }
}
