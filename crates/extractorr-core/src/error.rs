//! Error types for the watch-and-extract pipeline.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// The filesystem operation that failed while materializing an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOperation {
    /// Creating a directory (or a file's parent directories).
    CreateDirectory,
    /// Opening the entry's data stream inside the archive.
    OpenEntry,
    /// Creating or truncating the destination file.
    CreateFile,
    /// Copying bytes from the entry to the destination.
    Copy,
}

impl fmt::Display for EntryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CreateDirectory => "create directory",
            Self::OpenEntry => "open entry",
            Self::CreateFile => "create file",
            Self::Copy => "copy",
        };
        f.write_str(label)
    }
}

/// Errors that can occur while processing one source archive.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source never became readable within the retry budget.
    #[error("{path} never became readable after {attempts} attempts: {source}")]
    AcquisitionExhausted {
        /// The source path.
        path: PathBuf,
        /// Number of open attempts made.
        attempts: u32,
        /// The error returned by the last attempt.
        #[source]
        source: std::io::Error,
    },

    /// Opening the source failed with an error that retrying cannot fix.
    #[error("cannot open {path}: {source}")]
    Acquisition {
        /// The source path.
        path: PathBuf,
        /// The underlying open error.
        #[source]
        source: std::io::Error,
    },

    /// The source exists but is not a regular file.
    #[error("not a regular file: {path}")]
    NotAFile {
        /// The source path.
        path: PathBuf,
    },

    /// Archive format is unsupported or unrecognized.
    #[error("unsupported archive format: {path}")]
    UnsupportedFormat {
        /// The source path.
        path: PathBuf,
    },

    /// Archive is corrupted or invalid.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// Path traversal attempt detected.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The entry name that attempted traversal.
        path: PathBuf,
    },

    /// Materializing one entry failed.
    #[error("failed to {operation} for entry {entry}: {source}")]
    EntryIo {
        /// The archive-relative entry name.
        entry: PathBuf,
        /// What was being done when the error occurred.
        operation: EntryOperation,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Removing the source after a successful extraction failed.
    #[error("failed to delete {path}: {source}")]
    Deletion {
        /// The source path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ExtractionError {
    /// Returns `true` if this error represents a security violation.
    ///
    /// # Examples
    ///
    /// ```
    /// use extractorr_core::ExtractionError;
    /// use std::path::PathBuf;
    ///
    /// let err = ExtractionError::PathTraversal {
    ///     path: PathBuf::from("../etc/passwd"),
    /// };
    /// assert!(err.is_security_violation());
    ///
    /// let err = ExtractionError::InvalidArchive("truncated".into());
    /// assert!(!err.is_security_violation());
    /// ```
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(self, Self::PathTraversal { .. })
    }

    /// Returns `true` if a later write to the same source may succeed.
    ///
    /// Truncated archives and sources that stayed locked are typical for a
    /// writer that has not finished yet; the next write notification for the
    /// path retries the whole pipeline.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::AcquisitionExhausted { .. } | Self::InvalidArchive(_) | Self::Io(_)
        )
    }

    pub(crate) fn entry_io(
        entry: impl Into<PathBuf>,
        operation: EntryOperation,
        source: std::io::Error,
    ) -> Self {
        Self::EntryIo {
            entry: entry.into(),
            operation,
            source,
        }
    }
}
