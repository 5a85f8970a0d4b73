//! Format classification of acquired sources.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::service::CodecArchiveService;
use super::traits::ArchiveHandle;
use super::traits::ArchiveService;
use crate::Result;
use crate::acquire::AcquiredFile;

/// Binds an acquired file to the archive format it contains.
///
/// The classifier owns no format logic itself; it delegates to an
/// [`ArchiveService`], which defaults to [`CodecArchiveService`].
#[derive(Clone)]
pub struct FormatClassifier {
    service: Arc<dyn ArchiveService>,
}

impl FormatClassifier {
    /// Creates a classifier over a custom service.
    pub fn new(service: Arc<dyn ArchiveService>) -> Self {
        Self { service }
    }

    /// Classifies `source`, consuming it.
    ///
    /// On failure the file has already been dropped, so the source is
    /// closed and untouched.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for unrecognized streams, `InvalidArchive`
    /// if a recognized container is malformed, or `Io` if the stream cannot
    /// be read.
    pub fn classify(&self, source: AcquiredFile) -> Result<ArchiveHandle> {
        let (path, file) = source.into_parts();
        let handle = self.service.identify(&path, file)?;
        debug!(path = %path.display(), format = %handle.format(), "classified source");
        Ok(handle)
    }
}

impl Default for FormatClassifier {
    fn default() -> Self {
        Self::new(Arc::new(CodecArchiveService::new()))
    }
}

impl std::fmt::Debug for FormatClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatClassifier").finish_non_exhaustive()
    }
}
