//! Per-archive extraction reporting.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::ExtractionError;

/// Record of one extraction run.
///
/// A job is successful only if every entry was processed. Entries written
/// before a failure stay on disk; `first_error` tells why the run stopped.
#[derive(Debug)]
pub struct ExtractionJob {
    /// The archive that was extracted.
    pub source_path: PathBuf,

    /// Directory the entries were written under.
    pub output_root: PathBuf,

    /// Number of entries pulled from the archive, including skipped ones.
    pub entries_processed: usize,

    /// Number of regular files written.
    pub files_extracted: usize,

    /// Number of directory entries materialized.
    pub directories_created: usize,

    /// Number of entries of unsupported kinds that were skipped.
    pub entries_skipped: usize,

    /// Total bytes written to disk.
    pub bytes_written: u64,

    /// Wall time of the run.
    pub duration: Duration,

    /// The error that aborted the run, if any.
    pub first_error: Option<ExtractionError>,
}

impl ExtractionJob {
    /// Creates an empty job for `source_path` extracting into `output_root`.
    #[must_use]
    pub fn new(source_path: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            output_root: output_root.into(),
            entries_processed: 0,
            files_extracted: 0,
            directories_created: 0,
            entries_skipped: 0,
            bytes_written: 0,
            duration: Duration::ZERO,
            first_error: None,
        }
    }

    /// Returns `true` if every entry was processed without error.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.first_error.is_none()
    }

    /// Returns the source archive path.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Records the error that stops the run. Later errors are ignored.
    pub fn fail(&mut self, error: ExtractionError) {
        if self.first_error.is_none() {
            self.first_error = Some(error);
        }
    }

    /// Consumes the job, returning the aborting error if there was one.
    ///
    /// # Errors
    ///
    /// Returns `first_error` when the job failed.
    pub fn into_result(mut self) -> crate::Result<Self> {
        match self.first_error.take() {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}
