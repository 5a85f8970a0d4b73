//! ZIP archive reader.

use std::fs::File;
use std::io::Read;
use std::io::Seek;
use std::path::PathBuf;

use zip::result::ZipError;

use super::traits::ArchiveEntry;
use super::traits::ArchiveReader;
use super::traits::EntrySource;
use crate::ExtractionError;
use crate::Result;

/// Random-access ZIP reader walking the central directory in order.
pub struct ZipReader {
    archive: zip::ZipArchive<File>,
}

impl ZipReader {
    /// Reads the central directory of `file`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArchive` if the central directory is missing or
    /// malformed.
    pub fn new(file: File) -> Result<Self> {
        let archive = zip::ZipArchive::new(file).map_err(ExtractionError::from)?;
        Ok(Self { archive })
    }
}

impl ArchiveReader for ZipReader {
    fn entries(&mut self) -> Result<Box<dyn EntrySource + '_>> {
        Ok(Box::new(ZipEntries {
            archive: &mut self.archive,
            next: 0,
        }))
    }
}

struct ZipEntries<'a> {
    archive: &'a mut zip::ZipArchive<File>,
    next: usize,
}

impl EntrySource for ZipEntries<'_> {
    fn next_entry(&mut self) -> Option<Result<ArchiveEntry<'_>>> {
        if self.next >= self.archive.len() {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let entry = match self.archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e.into())),
        };

        // The raw name is kept; the traversal guard decides what is safe.
        let name = PathBuf::from(entry.name());
        Some(Ok(if entry.is_dir() {
            ArchiveEntry::directory(name)
        } else if is_zip_symlink(&entry) {
            ArchiveEntry::unsupported(name, "symlink")
        } else {
            ArchiveEntry::file(name, Box::new(entry))
        }))
    }
}

fn is_zip_symlink<R: Read + Seek>(entry: &zip::read::ZipFile<'_, R>) -> bool {
    const S_IFMT: u32 = 0o170_000;
    const S_IFLNK: u32 = 0o120_000;

    entry
        .unix_mode()
        .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
}

impl From<ZipError> for ExtractionError {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(e) => Self::Io(e),
            other => Self::InvalidArchive(format!("zip: {other}")),
        }
    }
}
