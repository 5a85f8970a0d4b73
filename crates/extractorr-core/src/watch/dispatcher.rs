//! The long-lived watch loop.
//!
//! [`WatchDispatcher::run`] consumes notifier messages until shutdown or
//! until the notifier is gone. Every accepted write is handed to a
//! [`Processor`] on tokio's blocking pool; at most one unit runs per path,
//! and writes that arrive while it runs make it run once more.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Filtering -> Processing -> Idle
//!   cancelled            -> Draining
//!   notifier gone / fatal -> Stopped
//! ```
//!
//! Both exits wait for every running unit before returning.

use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinError;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::event::WatchEvent;
use super::inflight::Admission;
use super::inflight::InFlight;
use super::notifier::EventReceiver;
use super::notifier::NotifierError;
use crate::ExtractionError;
use crate::pipeline::Processor;

/// Dispatcher states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatcherState {
    /// Waiting for events, nothing running.
    #[default]
    Idle,
    /// Deciding whether an event starts a unit.
    Filtering,
    /// At least one unit is running.
    Processing,
    /// Shutdown requested; intake stopped, units finishing.
    Draining,
    /// The notifier can no longer deliver events.
    Stopped,
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Filtering => "filtering",
            Self::Processing => "processing",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Counters reported when the dispatcher exits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchSummary {
    /// Events received from the notifier.
    pub events_seen: u64,
    /// Events that were not writes.
    pub events_ignored: u64,
    /// Writes folded into a running unit.
    pub events_coalesced: u64,
    /// Non-fatal notifier errors.
    pub notifier_errors: u64,
    /// Pipeline runs that succeeded.
    pub jobs_succeeded: u64,
    /// Pipeline runs that failed (including panics).
    pub jobs_failed: u64,
    /// Coalesced re-runs dropped because shutdown was requested.
    pub reruns_skipped: u64,
    /// `Draining` after a requested shutdown, `Stopped` otherwise.
    pub final_state: DispatcherState,
}

/// What one unit did before it gave up its slot.
#[derive(Debug, Default)]
struct UnitReport {
    succeeded: u64,
    failed: u64,
    rerun_skipped: bool,
}

/// Schedules pipeline units for write events.
pub struct WatchDispatcher {
    processor: Arc<dyn Processor>,
    inflight: InFlight,
    shutdown: CancellationToken,
    units: JoinSet<UnitReport>,
    state: DispatcherState,
    summary: DispatchSummary,
}

impl WatchDispatcher {
    /// Creates a dispatcher that stops intake once `shutdown` is cancelled.
    pub fn new(processor: Arc<dyn Processor>, shutdown: CancellationToken) -> Self {
        Self {
            processor,
            inflight: InFlight::new(),
            shutdown,
            units: JoinSet::new(),
            state: DispatcherState::Idle,
            summary: DispatchSummary::default(),
        }
    }

    /// Returns a handle to the in-flight set.
    #[must_use]
    pub fn in_flight(&self) -> InFlight {
        self.inflight.clone()
    }

    /// Runs until shutdown or until the notifier stops, then waits for all
    /// running units.
    pub async fn run(mut self, mut events: EventReceiver) -> DispatchSummary {
        info!("dispatcher started");

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => {
                    info!(running = self.units.len(), "shutdown requested, draining");
                    self.state = DispatcherState::Draining;
                    break;
                }

                Some(joined) = self.units.join_next(), if !self.units.is_empty() => {
                    self.reap(joined);
                }

                message = events.recv() => match message {
                    Some(Ok(event)) => self.dispatch(event),
                    Some(Err(err)) => {
                        if self.notifier_failed(&err) {
                            self.state = DispatcherState::Stopped;
                            break;
                        }
                    }
                    None => {
                        warn!("notifier channel closed, stopping");
                        self.state = DispatcherState::Stopped;
                        break;
                    }
                },
            }
        }

        // The exit state is fixed here; draining only collects counters.
        while let Some(joined) = self.units.join_next().await {
            self.record(joined);
        }

        self.summary.final_state = self.state;
        info!(
            state = %self.state,
            succeeded = self.summary.jobs_succeeded,
            failed = self.summary.jobs_failed,
            "dispatcher stopped"
        );
        self.summary
    }

    fn dispatch(&mut self, event: WatchEvent) {
        self.summary.events_seen += 1;
        self.state = DispatcherState::Filtering;

        if !event.is_write() {
            trace!(path = %event.path.display(), operation = ?event.operation, "ignoring event");
            self.summary.events_ignored += 1;
            self.settle();
            return;
        }

        match self.inflight.admit(&event.path) {
            Admission::Started => self.spawn_unit(event.path),
            Admission::Coalesced => {
                debug!(path = %event.path.display(), "already processing, will run again");
                self.summary.events_coalesced += 1;
            }
        }
        self.settle();
    }

    fn spawn_unit(&mut self, path: PathBuf) {
        let processor = Arc::clone(&self.processor);
        let inflight = self.inflight.clone();
        let shutdown = self.shutdown.clone();

        self.units.spawn_blocking(move || {
            let mut report = UnitReport::default();
            loop {
                if run_once(processor.as_ref(), &path) {
                    report.succeeded += 1;
                } else {
                    report.failed += 1;
                }

                if shutdown.is_cancelled() {
                    report.rerun_skipped = inflight.release(&path);
                    break;
                }
                if !inflight.complete(&path) {
                    break;
                }
                debug!(path = %path.display(), "re-running after coalesced writes");
            }
            report
        });
    }

    fn reap(&mut self, joined: Result<UnitReport, JoinError>) {
        self.record(joined);
        self.settle();
    }

    fn record(&mut self, joined: Result<UnitReport, JoinError>) {
        match joined {
            Ok(report) => {
                self.summary.jobs_succeeded += report.succeeded;
                self.summary.jobs_failed += report.failed;
                if report.rerun_skipped {
                    self.summary.reruns_skipped += 1;
                }
            }
            Err(e) => {
                error!(error = %e, "pipeline unit did not complete");
                self.summary.jobs_failed += 1;
            }
        }
    }

    /// Returns `true` if the dispatcher must stop.
    fn notifier_failed(&mut self, err: &NotifierError) -> bool {
        if err.is_fatal() {
            error!(error = %err, "watch lost, stopping");
            return true;
        }
        warn!(error = %err, "notifier error");
        self.summary.notifier_errors += 1;
        false
    }

    fn settle(&mut self) {
        self.state = if self.units.is_empty() {
            DispatcherState::Idle
        } else {
            DispatcherState::Processing
        };
    }
}

impl fmt::Debug for WatchDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchDispatcher")
            .field("state", &self.state)
            .field("running", &self.units.len())
            .finish_non_exhaustive()
    }
}

/// Runs the processor once and logs the outcome. Panics count as failures
/// so the path's slot is always released.
fn run_once(processor: &dyn Processor, path: &Path) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| processor.process(path))) {
        Ok(Ok(outcome)) => {
            info!(
                path = %path.display(),
                format = %outcome.format,
                files = outcome.job.files_extracted,
                cleanup = ?outcome.cleanup,
                "archive processed"
            );
            true
        }
        Ok(Err(err)) => {
            log_failure(path, &err);
            false
        }
        Err(_) => {
            error!(path = %path.display(), "pipeline panicked");
            false
        }
    }
}

fn log_failure(path: &Path, err: &ExtractionError) {
    if err.is_security_violation() {
        error!(path = %path.display(), error = %err, "rejected archive");
    } else if matches!(err, ExtractionError::Acquisition { .. }) {
        debug!(path = %path.display(), error = %err, "source not available");
    } else {
        warn!(
            path = %path.display(),
            error = %err,
            transient = err.is_transient(),
            "failed to process archive"
        );
    }
}
