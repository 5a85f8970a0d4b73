//! Filesystem events as seen by the dispatcher.

use std::path::Path;
use std::path::PathBuf;

use notify::EventKind;
use notify::event::AccessKind;
use notify::event::AccessMode;
use notify::event::ModifyKind;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// File contents were written.
    Write,
    /// A file or directory appeared.
    Create,
    /// A file or directory was removed.
    Remove,
    /// A file or directory was renamed.
    Rename,
    /// Metadata changes, reads and anything else.
    Other,
}

impl Operation {
    /// Maps a `notify` event kind.
    ///
    /// Data modifications and close-after-write count as writes. Renames are
    /// reported as `Modify(Name)` by `notify` and mapped to [`Rename`].
    ///
    /// [`Rename`]: Operation::Rename
    #[must_use]
    pub const fn from_kind(kind: &EventKind) -> Self {
        match kind {
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
            | EventKind::Access(AccessKind::Close(AccessMode::Write)) => Self::Write,
            EventKind::Modify(ModifyKind::Name(_)) => Self::Rename,
            EventKind::Create(_) => Self::Create,
            EventKind::Remove(_) => Self::Remove,
            _ => Self::Other,
        }
    }
}

/// One path plus what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Affected path.
    pub path: PathBuf,
    /// Kind of change.
    pub operation: Operation,
}

impl WatchEvent {
    /// Creates an event.
    pub fn new(path: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            path: path.into(),
            operation,
        }
    }

    /// Shorthand for a write to `path`.
    pub fn write(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Operation::Write)
    }

    /// Returns the affected path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` for write events.
    #[must_use]
    pub fn is_write(&self) -> bool {
        self.operation == Operation::Write
    }

    /// Splits a `notify` event into one event per path.
    pub fn from_notify(event: notify::Event) -> impl Iterator<Item = Self> {
        let operation = Operation::from_kind(&event.kind);
        event
            .paths
            .into_iter()
            .map(move |path| Self { path, operation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::CreateKind;
    use notify::event::DataChange;
    use notify::event::MetadataKind;
    use notify::event::RemoveKind;
    use notify::event::RenameMode;

    #[test]
    fn test_operation_mapping() {
        let cases = [
            (
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                Operation::Write,
            ),
            (EventKind::Modify(ModifyKind::Any), Operation::Write),
            (
                EventKind::Access(AccessKind::Close(AccessMode::Write)),
                Operation::Write,
            ),
            (
                EventKind::Access(AccessKind::Close(AccessMode::Read)),
                Operation::Other,
            ),
            (EventKind::Create(CreateKind::File), Operation::Create),
            (EventKind::Remove(RemoveKind::File), Operation::Remove),
            (
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                Operation::Rename,
            ),
            (
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                Operation::Other,
            ),
            (EventKind::Any, Operation::Other),
        ];

        for (kind, expected) in cases {
            assert_eq!(Operation::from_kind(&kind), expected, "{kind:?}");
        }
    }

    #[test]
    fn test_from_notify_splits_paths() {
        let event = notify::Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/in/a.zip"))
            .add_path(PathBuf::from("/in/b.zip"));

        let events: Vec<WatchEvent> = WatchEvent::from_notify(event).collect();
        assert_eq!(
            events,
            vec![WatchEvent::write("/in/a.zip"), WatchEvent::write("/in/b.zip")]
        );
        assert!(events.iter().all(WatchEvent::is_write));
    }
}
