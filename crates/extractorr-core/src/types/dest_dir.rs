//! Validated destination directory type.

use crate::ExtractionError;
use crate::Result;
use std::io;
use std::path::Path;
use std::path::PathBuf;

/// An existing directory, held as its absolute canonical path.
///
/// Entry paths are validated against this canonical form, so symlinks in
/// the configured output location are resolved once, up front.
///
/// # Examples
///
/// ```no_run
/// use extractorr_core::types::DestDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("/srv/out/bundle")?;
/// println!("Extracting to: {}", dest.as_path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestDir(PathBuf);

impl DestDir {
    /// Wraps an existing directory.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error if the path does not exist, is not a directory
    /// or cannot be canonicalized.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let canonical = path.canonicalize().map_err(|e| {
            ExtractionError::Io(io::Error::new(
                e.kind(),
                format!("failed to canonicalize path {}: {e}", path.display()),
            ))
        })?;

        if !canonical.is_dir() {
            return Err(ExtractionError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path is not a directory: {}", path.display()),
            )));
        }

        Ok(Self(canonical))
    }

    /// Creates the directory and its ancestors if missing, then wraps it.
    ///
    /// Concurrent creators are tolerated.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error if creation fails or the path exists as a
    /// non-directory.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path).map_err(|e| {
            ExtractionError::Io(io::Error::new(
                e.kind(),
                format!("failed to create directory {}: {e}", path.display()),
            ))
        })?;
        Self::new(path)
    }

    /// Returns the path as a `&Path`.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Joins a validated entry path to this directory.
    #[inline]
    #[must_use]
    pub fn join(&self, safe_path: &super::SafePath) -> PathBuf {
        self.0.join(safe_path.as_path())
    }
}
