//! One acquire → classify → extract → cleanup run for a single path.

use std::path::Path;
use std::path::PathBuf;

use tracing::info;
use tracing::warn;

use crate::Result;
use crate::WatchConfig;
use crate::acquire::RetryingAcquirer;
use crate::cleanup::CleanupManager;
use crate::cleanup::CleanupOutcome;
use crate::extraction::ExtractionEngine;
use crate::formats::ArchiveType;
use crate::formats::FormatClassifier;
use crate::report::ExtractionJob;
use crate::types::OutputRoot;

/// Work the dispatcher schedules for every accepted write event.
///
/// Implementations run on a blocking thread and may block freely.
pub trait Processor: Send + Sync + 'static {
    /// Processes the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the error that ended processing. The dispatcher logs it and
    /// moves on.
    fn process(&self, path: &Path) -> Result<PipelineOutcome>;
}

/// Result of a successful pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Detected archive format.
    pub format: ArchiveType,
    /// Extraction statistics.
    pub job: ExtractionJob,
    /// What happened to the source afterward.
    pub cleanup: CleanupOutcome,
}

/// The watch-and-extract pipeline.
///
/// # Examples
///
/// ```no_run
/// use extractorr_core::{Pipeline, Processor, WatchConfig};
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = Pipeline::new(&WatchConfig::new("/in", "/out"));
/// let outcome = pipeline.process(Path::new("/in/bundle.tar.gz"))?;
/// println!("extracted {} files", outcome.job.files_extracted);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    output_dir: PathBuf,
    acquirer: RetryingAcquirer,
    classifier: FormatClassifier,
    cleanup: CleanupManager,
}

impl Pipeline {
    /// Builds a pipeline from validated configuration.
    #[must_use]
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            acquirer: RetryingAcquirer::new(config.retry.clone()),
            classifier: FormatClassifier::default(),
            cleanup: CleanupManager::new(config.delete_policy),
        }
    }

    /// Replaces the acquirer. Its retry policy takes the place of the configured one.
    #[must_use]
    pub fn with_acquirer(mut self, acquirer: RetryingAcquirer) -> Self {
        self.acquirer = acquirer;
        self
    }

    /// Replaces the format classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: FormatClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Runs every stage for `path`.
    ///
    /// Nothing is created under the output directory unless the source was
    /// acquired and recognized. The archive is closed before cleanup, and a
    /// failed cleanup is logged without failing the run.
    ///
    /// # Errors
    ///
    /// Returns the first acquisition, classification or extraction error.
    pub fn run(&self, path: &Path) -> Result<PipelineOutcome> {
        let output_root = OutputRoot::derive(&self.output_dir, path)?;
        let source = self.acquirer.acquire(path)?;
        let mut handle = self.classifier.classify(source)?;
        let format = handle.format();

        info!(
            path = %path.display(),
            format = %format,
            output = %output_root.as_path().display(),
            "extracting archive"
        );

        let job = {
            let mut entries = handle.entries()?;
            ExtractionEngine::new().extract(entries.as_mut(), &output_root, path)
        };
        drop(handle);

        let cleanup = self
            .cleanup
            .maybe_delete(path, &job)
            .unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "extraction succeeded but source was kept");
                CleanupOutcome::Retained
            });

        let job = job.into_result()?;
        Ok(PipelineOutcome {
            format,
            job,
            cleanup,
        })
    }
}

impl Processor for Pipeline {
    fn process(&self, path: &Path) -> Result<PipelineOutcome> {
        self.run(path)
    }
}
