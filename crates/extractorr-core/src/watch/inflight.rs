//! Per-path re-entrancy guard.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

/// Outcome of [`InFlight::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// No job was running for the path; the caller must start one.
    Started,
    /// A job is running; it will run once more when it finishes.
    Coalesced,
}

/// Set of paths with a running job, each with a pending re-run flag.
///
/// Cloning shares the set. All operations take a short-lived lock; a
/// poisoned lock is recovered since the map stays consistent between
/// operations.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    paths: Arc<Mutex<HashMap<PathBuf, bool>>>,
}

impl InFlight {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in processing `path`.
    ///
    /// Any number of calls while a job runs collapse into one re-run.
    pub fn admit(&self, path: &Path) -> Admission {
        let mut paths = self.lock();
        if let Some(rerun) = paths.get_mut(path) {
            *rerun = true;
            Admission::Coalesced
        } else {
            paths.insert(path.to_path_buf(), false);
            Admission::Started
        }
    }

    /// Called by a job when it finishes a run.
    ///
    /// Returns `true` if the path was written again meanwhile; the job then
    /// keeps its slot and must run once more. Otherwise the slot is freed.
    pub fn complete(&self, path: &Path) -> bool {
        let mut paths = self.lock();
        match paths.get_mut(path) {
            Some(rerun) if *rerun => {
                *rerun = false;
                true
            }
            _ => {
                paths.remove(path);
                false
            }
        }
    }

    /// Frees the slot for `path`, dropping any pending re-run.
    ///
    /// Returns `true` if a re-run was pending.
    pub fn release(&self, path: &Path) -> bool {
        self.lock().remove(path).unwrap_or(false)
    }

    /// Returns `true` if a job is running for `path`.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    /// Returns the number of paths with a running job.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no job is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, bool>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
