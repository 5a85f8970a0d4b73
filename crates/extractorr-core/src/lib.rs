//! Watch a directory and extract every archive written into it.
//!
//! `extractorr-core` implements the pipeline behind the `extractorr` agent:
//! a write notification for a path becomes a retried open
//! ([`RetryingAcquirer`]), a format decision ([`FormatClassifier`]), a
//! traversal-safe extraction ([`ExtractionEngine`]) into
//! `OUTPUT_DIR/<archive name>/`, and optionally removal of the source
//! ([`CleanupManager`]). [`WatchDispatcher`] drives the pipeline from
//! filesystem events.
//!
//! Supported formats: zip, tar, tar.gz, tar.bz2, tar.xz and tar.zst.
//!
//! # Examples
//!
//! ```no_run
//! use extractorr_core::{DeletePolicy, Pipeline, Processor, WatchConfig};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WatchConfig::new("/srv/in", "/srv/out").with_delete_policy(DeletePolicy::Delete);
//! config.validate()?;
//!
//! let outcome = Pipeline::new(&config).process(Path::new("/srv/in/bundle.tar.gz"))?;
//! println!("Extracted {} files", outcome.job.files_extracted);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod acquire;
pub mod cleanup;
pub mod config;
pub mod copy;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod pipeline;
pub mod report;
pub mod types;
pub mod watch;

#[doc(hidden)]
pub mod test_utils;

pub use acquire::AcquiredFile;
pub use acquire::RetryingAcquirer;
pub use cleanup::CleanupManager;
pub use cleanup::CleanupOutcome;
pub use config::ConfigError;
pub use config::DeletePolicy;
pub use config::RetryPolicy;
pub use config::WatchConfig;
pub use error::EntryOperation;
pub use error::ExtractionError;
pub use error::Result;
pub use extraction::ExtractionEngine;
pub use formats::ArchiveType;
pub use formats::FormatClassifier;
pub use pipeline::Pipeline;
pub use pipeline::PipelineOutcome;
pub use pipeline::Processor;
pub use report::ExtractionJob;
pub use types::DestDir;
pub use types::OutputRoot;
pub use types::SafePath;
pub use watch::DispatchSummary;
pub use watch::WatchDispatcher;
