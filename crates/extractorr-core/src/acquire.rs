//! Opening sources that may still be held by their writer.
//!
//! Write notifications often arrive while an editor, network copier or
//! archiver still holds the file. [`RetryingAcquirer`] retries the open with
//! exponential backoff before giving up.

use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::ExtractionError;
use crate::Result;
use crate::RetryPolicy;

/// An open, readable source bound to its path.
///
/// Dropping it closes the underlying handle.
#[derive(Debug)]
pub struct AcquiredFile {
    path: PathBuf,
    file: File,
}

impl AcquiredFile {
    /// Returns the path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Splits into path and open file.
    #[must_use]
    pub fn into_parts(self) -> (PathBuf, File) {
        (self.path, self.file)
    }
}

/// Single open attempt used by [`RetryingAcquirer::acquire`].
pub type OpenFn = dyn Fn(&Path) -> io::Result<File> + Send + Sync;

/// Opens files for reading with bounded retry.
#[derive(Clone)]
pub struct RetryingAcquirer {
    policy: RetryPolicy,
    open: Arc<OpenFn>,
}

impl Default for RetryingAcquirer {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl std::fmt::Debug for RetryingAcquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingAcquirer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryingAcquirer {
    /// Creates an acquirer using the given policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            open: Arc::new(open_regular_file),
        }
    }

    /// Replaces the single-attempt opener, e.g. to simulate a writer that
    /// holds the file for a while.
    #[must_use]
    pub fn with_opener<F>(mut self, open: F) -> Self
    where
        F: Fn(&Path) -> io::Result<File> + Send + Sync + 'static,
    {
        self.open = Arc::new(open);
        self
    }

    /// Opens `path` for reading, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - `AcquisitionExhausted` if every attempt failed with a retryable error
    /// - `Acquisition` for errors retrying cannot fix (e.g. the file vanished)
    /// - `NotAFile` if the path is a directory or special file
    pub fn acquire(&self, path: &Path) -> Result<AcquiredFile> {
        let file = self.acquire_with(path, |p| (self.open)(p))?;
        Ok(AcquiredFile {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Runs `open` under the retry policy and returns its first success.
    ///
    /// `open` may return `ErrorKind::InvalidData` with a [`NotAFileMarker`]
    /// payload to signal a non-regular file; any other error is classified
    /// by its kind.
    pub fn acquire_with<T, F>(&self, path: &Path, mut open: F) -> Result<T>
    where
        F: FnMut(&Path) -> io::Result<T>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match open(path) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(path = %path.display(), attempt, "source became readable");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if is_not_a_file(&err) {
                return Err(ExtractionError::NotAFile {
                    path: path.to_path_buf(),
                });
            }
            if !is_retryable(&err) {
                return Err(ExtractionError::Acquisition {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
            if attempt >= max_attempts {
                return Err(ExtractionError::AcquisitionExhausted {
                    path: path.to_path_buf(),
                    attempts: attempt,
                    source: err,
                });
            }

            attempt += 1;
            let delay = self.policy.delay_before(attempt);
            debug!(
                path = %path.display(),
                attempt,
                delay_ms = delay.as_millis(),
                error = %err,
                "source not readable yet, retrying"
            );
            thread::sleep(delay);
        }
    }
}

/// Error payload used by openers to report a path that is not a regular
/// file.
#[derive(Debug)]
pub struct NotAFileMarker;

impl std::fmt::Display for NotAFileMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("not a regular file")
    }
}

impl std::error::Error for NotAFileMarker {}

fn open_regular_file(path: &Path) -> io::Result<File> {
    let file = File::open(path)?;
    if file.metadata()?.is_file() {
        Ok(file)
    } else {
        Err(io::Error::new(io::ErrorKind::InvalidData, NotAFileMarker))
    }
}

fn is_not_a_file(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<NotAFileMarker>())
}

/// Lock, permission and not-yet-flushed conditions are retried; anything
/// that describes the path itself is not.
fn is_retryable(err: &io::Error) -> bool {
    !matches!(
        err.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::IsADirectory
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::InvalidFilename
            | io::ErrorKind::Unsupported
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use std::time::Instant;
    use tempfile::TempDir;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), 2.0)
    }

    #[test]
    fn test_acquire_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.zip");
        std::fs::write(&path, b"data").unwrap();

        let acquirer = RetryingAcquirer::new(fast_policy(3));
        let acquired = acquirer.acquire(&path).unwrap();
        assert_eq!(acquired.path(), path);
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let acquirer = RetryingAcquirer::new(fast_policy(5));
        let mut calls = 0;
        let value = acquirer
            .acquire_with(Path::new("/in/a.zip"), |_| {
                calls += 1;
                if calls < 3 {
                    Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
                } else {
                    Ok(calls)
                }
            })
            .unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhausts_after_max_attempts() {
        let acquirer = RetryingAcquirer::new(fast_policy(4));
        let mut calls = 0;
        let result: Result<()> = acquirer.acquire_with(Path::new("/in/a.zip"), |_| {
            calls += 1;
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        });
        assert_eq!(calls, 4);
        match result {
            Err(ExtractionError::AcquisitionExhausted {
                attempts, source, ..
            }) => {
                assert_eq!(attempts, 4);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected AcquisitionExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let acquirer = RetryingAcquirer::new(fast_policy(5));
        let mut calls = 0;
        let result: Result<()> = acquirer.acquire_with(Path::new("/in/gone.zip"), |_| {
            calls += 1;
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        });
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(ExtractionError::Acquisition { .. })));
    }

    #[test]
    fn test_directory_is_rejected() {
        let temp = TempDir::new().unwrap();
        let acquirer = RetryingAcquirer::new(fast_policy(3));
        let result = acquirer.acquire(temp.path());
        assert!(
            matches!(
                result,
                Err(ExtractionError::NotAFile { .. } | ExtractionError::Acquisition { .. })
            ),
            "directories must not be acquired: {result:?}"
        );
    }

    #[test]
    fn test_backoff_waits_between_attempts() {
        let acquirer = RetryingAcquirer::new(RetryPolicy::new(3, Duration::from_millis(20), 2.0));
        let start = Instant::now();
        let result: Result<()> = acquirer.acquire_with(Path::new("/in/a.zip"), |_| {
            Err(io::Error::new(io::ErrorKind::WouldBlock, "busy"))
        });
        assert!(result.is_err());
        // 20ms before attempt 2, 40ms before attempt 3
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_single_attempt_policy() {
        let acquirer = RetryingAcquirer::new(fast_policy(1));
        let mut calls = 0;
        let result: Result<()> = acquirer.acquire_with(Path::new("/in/a.zip"), |_| {
            calls += 1;
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        });
        assert_eq!(calls, 1);
        assert!(matches!(
            result,
            Err(ExtractionError::AcquisitionExhausted { attempts: 1, .. })
        ));
    }
}
