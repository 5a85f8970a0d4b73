//! Source removal after extraction.

use std::path::Path;

use tracing::info;

use crate::DeletePolicy;
use crate::ExtractionError;
use crate::Result;
use crate::report::ExtractionJob;

/// What happened to the source archive after extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The source was removed.
    Deleted,
    /// The source was left in place.
    Retained,
}

/// Applies the [`DeletePolicy`] to a finished job.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupManager {
    policy: DeletePolicy,
}

impl CleanupManager {
    /// Creates a manager for `policy`.
    #[must_use]
    pub const fn new(policy: DeletePolicy) -> Self {
        Self { policy }
    }

    /// Removes `source` if deletion is enabled and `job` succeeded.
    ///
    /// # Errors
    ///
    /// Returns `Deletion` if the file could not be removed. The extraction
    /// itself stands either way.
    pub fn maybe_delete(&self, source: &Path, job: &ExtractionJob) -> Result<CleanupOutcome> {
        if !self.policy.is_enabled() || !job.is_success() {
            return Ok(CleanupOutcome::Retained);
        }

        std::fs::remove_file(source).map_err(|e| ExtractionError::Deletion {
            path: source.to_path_buf(),
            source: e,
        })?;
        info!(path = %source.display(), "deleted source archive");
        Ok(CleanupOutcome::Deleted)
    }
}
