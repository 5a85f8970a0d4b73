//! Bridge from `notify` callbacks to an async event channel.
//!
//! `notify` delivers events on its own thread. The callback forwards them
//! with `blocking_send`, one [`WatchEvent`] per path, to a bounded tokio
//! channel the dispatcher consumes. Watch errors travel on the same channel
//! as [`NotifierError`]s, flagged fatal when the watched directory is gone.

use std::io;
use std::path::Path;
use std::path::PathBuf;

use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;

use super::event::WatchEvent;

/// Buffer between the notify thread and the dispatcher.
const CHANNEL_CAPACITY: usize = 256;

/// Messages delivered by a [`Notifier`].
pub type NotifierMessage = Result<WatchEvent, NotifierError>;

/// Receiving half handed to the dispatcher.
pub type EventReceiver = mpsc::Receiver<NotifierMessage>;

/// Errors raised while setting up the watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The platform watcher could not be created.
    #[error("failed to initialize watcher: {0}")]
    Init(#[source] notify::Error),

    /// The directory could not be watched.
    #[error("failed to watch {path}: {source}")]
    Watch {
        /// Directory that was to be watched.
        path: PathBuf,
        /// Underlying notify error.
        #[source]
        source: notify::Error,
    },
}

/// A watch error reported while running.
#[derive(Debug, thiserror::Error)]
#[error("notifier error (fatal: {fatal}): {source}")]
pub struct NotifierError {
    fatal: bool,
    #[source]
    source: notify::Error,
}

impl NotifierError {
    /// Wraps `source` with an explicit severity.
    #[must_use]
    pub const fn new(source: notify::Error, fatal: bool) -> Self {
        Self { fatal, source }
    }

    /// Classifies a `notify` error. Losing the watch itself is fatal,
    /// everything else (queue overflow, transient I/O) is not.
    #[must_use]
    pub fn from_notify(source: notify::Error) -> Self {
        let fatal = matches!(
            source.kind,
            notify::ErrorKind::PathNotFound | notify::ErrorKind::WatchNotFound
        );
        Self { fatal, source }
    }

    /// Returns `true` if the notifier cannot deliver further events.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.fatal
    }
}

/// Non-recursive watch on one directory.
///
/// Events stop when the `Notifier` is dropped, which also closes the channel.
pub struct Notifier {
    dir: PathBuf,
    tx: mpsc::Sender<NotifierMessage>,
    _watcher: RecommendedWatcher,
}

impl Notifier {
    /// Starts watching `dir` and returns the notifier with its event stream.
    ///
    /// # Errors
    ///
    /// Returns `WatchError` if the directory cannot be resolved or watched.
    pub fn start(dir: &Path) -> Result<(Self, EventReceiver), WatchError> {
        let dir = dir.canonicalize().map_err(|e| WatchError::Watch {
            path: dir.to_path_buf(),
            source: notify::Error::io(e),
        })?;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let callback_tx = tx.clone();
        let watched = dir.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            // The receiver is gone once the dispatcher stopped; nothing to do.
            for message in translate(&watched, res) {
                if callback_tx.blocking_send(message).is_err() {
                    return;
                }
            }
        })
        .map_err(WatchError::Init)?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Watch {
                path: dir.clone(),
                source,
            })?;

        info!(dir = %dir.display(), "watching directory");
        Ok((
            Self {
                dir,
                tx,
                _watcher: watcher,
            },
            rx,
        ))
    }

    /// Returns the watched directory (canonical).
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Emits a write event for every regular file already in the directory.
    ///
    /// Returns the number of events sent. Must run while the dispatcher is
    /// consuming, since the channel is bounded.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub async fn scan_existing(&self) -> io::Result<usize> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        let mut sent = 0;
        for path in files {
            debug!(path = %path.display(), "queueing existing file");
            if self.tx.send(Ok(WatchEvent::write(path))).await.is_err() {
                break;
            }
            sent += 1;
        }
        Ok(sent)
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

/// Turns one notify callback into channel messages.
fn translate(watched: &Path, res: notify::Result<notify::Event>) -> Vec<NotifierMessage> {
    match res {
        Ok(event) => {
            if matches!(event.kind, EventKind::Remove(_)) && event.paths.iter().any(|p| p == watched)
            {
                let lost = notify::Error::path_not_found().add_path(watched.to_path_buf());
                return vec![Err(NotifierError::new(lost, true))];
            }
            WatchEvent::from_notify(event)
                .filter(|e| e.path != watched)
                .map(Ok)
                .collect()
        }
        Err(e) => vec![Err(NotifierError::from_notify(e))],
    }
}
