//! Contract between the pipeline and archive format handlers.
//!
//! An [`ArchiveService`] turns an open file into an [`ArchiveHandle`]. The
//! handle exposes its entries as an [`EntrySource`]: a forward-only, pull
//! based sequence that lends one [`ArchiveEntry`] at a time, so archives of
//! any size are processed without buffering and an entry cannot outlive the
//! next pull.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use super::detect::ArchiveType;
use crate::Result;

/// Kind of an archive entry as far as extraction is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file with a data stream.
    File,
    /// Directory.
    Directory,
    /// Anything else (symlink, hardlink, device, FIFO). The label names it.
    Unsupported(&'static str),
}

/// One record lent by an [`EntrySource`].
pub struct ArchiveEntry<'a> {
    name: PathBuf,
    kind: EntryKind,
    reader: Option<Box<dyn Read + 'a>>,
}

impl<'a> ArchiveEntry<'a> {
    /// Creates a file entry with its data stream.
    pub fn file(name: impl Into<PathBuf>, reader: Box<dyn Read + 'a>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            reader: Some(reader),
        }
    }

    /// Creates a directory entry.
    pub fn directory(name: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            reader: None,
        }
    }

    /// Creates an entry of a kind the extractor does not materialize.
    pub fn unsupported(name: impl Into<PathBuf>, label: &'static str) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Unsupported(label),
            reader: None,
        }
    }

    /// Returns the archive-relative name, exactly as stored.
    #[must_use]
    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Returns the entry kind.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Returns `true` for directory entries.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    /// Takes the data stream. Only file entries have one, and only once.
    pub fn take_reader(&mut self) -> Option<Box<dyn Read + 'a>> {
        self.reader.take()
    }
}

impl fmt::Debug for ArchiveEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("has_reader", &self.reader.is_some())
            .finish()
    }
}

/// Forward-only sequence of archive entries.
pub trait EntrySource {
    /// Pulls the next entry.
    ///
    /// Returns `None` once the archive is exhausted. An `Err` means the
    /// archive itself could not be read further.
    fn next_entry(&mut self) -> Option<Result<ArchiveEntry<'_>>>;
}

/// Format-specific reader behind an [`ArchiveHandle`].
pub trait ArchiveReader: Send {
    /// Starts the entry sequence. Can only be started once.
    fn entries(&mut self) -> Result<Box<dyn EntrySource + '_>>;
}

/// Result of classification: a format tag and the means to enumerate
/// entries. Dropping the handle closes the source.
pub struct ArchiveHandle {
    format: ArchiveType,
    reader: Box<dyn ArchiveReader>,
}

impl ArchiveHandle {
    /// Wraps a format reader.
    #[must_use]
    pub fn new(format: ArchiveType, reader: Box<dyn ArchiveReader>) -> Self {
        Self { format, reader }
    }

    /// Returns the detected format.
    #[must_use]
    pub const fn format(&self) -> ArchiveType {
        self.format
    }

    /// Starts the entry sequence.
    pub fn entries(&mut self) -> Result<Box<dyn EntrySource + '_>> {
        self.reader.entries()
    }
}

impl fmt::Debug for ArchiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveHandle")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Classifies a byte stream and binds an entry reader to it.
pub trait ArchiveService: Send + Sync {
    /// Identifies the format of `file` (opened from `path`).
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for streams the service does not
    /// recognize.
    fn identify(&self, path: &Path, file: File) -> Result<ArchiveHandle>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_file_entry_reader_taken_once() {
        let mut entry = ArchiveEntry::file("a.txt", Box::new(Cursor::new(b"hi".to_vec())));
        assert_eq!(entry.kind(), EntryKind::File);
        assert!(!entry.is_directory());

        let mut reader = entry.take_reader().unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hi");
        assert!(entry.take_reader().is_none());
    }

    #[test]
    fn test_directory_entry_has_no_reader() {
        let mut entry = ArchiveEntry::directory("sub/");
        assert!(entry.is_directory());
        assert!(entry.take_reader().is_none());
        assert_eq!(entry.name(), Path::new("sub/"));
    }

    #[test]
    fn test_unsupported_entry_debug() {
        let entry = ArchiveEntry::unsupported("link", "symlink");
        assert_eq!(entry.kind(), EntryKind::Unsupported("symlink"));
        let debug = format!("{entry:?}");
        assert!(debug.contains("link"));
        assert!(debug.contains("has_reader: false"));
    }
}
