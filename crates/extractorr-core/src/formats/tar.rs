//! Tar archive reader (plain and compressed).
//!
//! A tar stream that simply stops at a header boundary is not a complete
//! archive: a finished archive ends with zero blocks. Hitting end of input
//! before the end-of-archive block is reported as [`ExtractionError::InvalidArchive`],
//! which keeps a half-written source from being treated as extracted.

use std::io;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tar::EntryType;

use super::traits::ArchiveEntry;
use super::traits::ArchiveReader;
use super::traits::EntrySource;
use crate::ExtractionError;
use crate::Result;

type TarStream = Box<dyn Read + Send>;

/// Streaming tar reader over an already-decompressed byte stream.
pub struct TarReader {
    archive: tar::Archive<EofTracking>,
    exhausted: Arc<AtomicBool>,
}

impl TarReader {
    /// Creates a reader over `stream`.
    #[must_use]
    pub fn new(stream: TarStream) -> Self {
        let exhausted = Arc::new(AtomicBool::new(false));
        Self {
            archive: tar::Archive::new(EofTracking {
                inner: stream,
                exhausted: Arc::clone(&exhausted),
            }),
            exhausted,
        }
    }
}

impl ArchiveReader for TarReader {
    fn entries(&mut self) -> Result<Box<dyn EntrySource + '_>> {
        let entries = self.archive.entries().map_err(invalid_archive)?;
        Ok(Box::new(TarEntries {
            entries,
            exhausted: &self.exhausted,
            finished: false,
        }))
    }
}

/// Records whether the underlying stream ever reported end of input.
struct EofTracking {
    inner: TarStream,
    exhausted: Arc<AtomicBool>,
}

impl Read for EofTracking {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.exhausted.store(true, Ordering::Relaxed);
        }
        Ok(n)
    }
}

struct TarEntries<'a> {
    entries: tar::Entries<'a, EofTracking>,
    exhausted: &'a AtomicBool,
    finished: bool,
}

impl EntrySource for TarEntries<'_> {
    fn next_entry(&mut self) -> Option<Result<ArchiveEntry<'_>>> {
        if self.finished {
            return None;
        }
        let Some(next) = self.entries.next() else {
            self.finished = true;
            // The tar crate stops on a zero block without reading past it,
            // so end of input here means the marker never arrived.
            if self.exhausted.load(Ordering::Relaxed) {
                return Some(Err(ExtractionError::InvalidArchive(
                    "tar: stream ended before the end-of-archive marker".into(),
                )));
            }
            return None;
        };
        match next {
            Ok(entry) => Some(convert_entry(entry)),
            Err(e) => Some(Err(invalid_archive(e))),
        }
    }
}

fn convert_entry<'a>(entry: tar::Entry<'a, EofTracking>) -> Result<ArchiveEntry<'a>> {
    let name = entry.path().map_err(invalid_archive)?.into_owned();
    let entry_type = entry.header().entry_type();

    Ok(match entry_type {
        EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => {
            ArchiveEntry::file(name, Box::new(entry))
        }
        EntryType::Directory => ArchiveEntry::directory(name),
        other => ArchiveEntry::unsupported(name, unsupported_label(other)),
    })
}

fn unsupported_label(entry_type: EntryType) -> &'static str {
    match entry_type {
        EntryType::Symlink => "symlink",
        EntryType::Link => "hardlink",
        EntryType::Char | EntryType::Block => "device",
        EntryType::Fifo => "fifo",
        EntryType::XGlobalHeader => "pax global header",
        _ => "special entry",
    }
}

fn invalid_archive(err: std::io::Error) -> ExtractionError {
    ExtractionError::InvalidArchive(format!("tar: {err}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::formats::traits::EntryKind;
    use crate::test_utils::TarTestBuilder;
    use crate::test_utils::create_test_tar;
    use std::io::Cursor;

    fn reader_for(data: Vec<u8>) -> TarReader {
        TarReader::new(Box::new(Cursor::new(data)))
    }

    #[test]
    fn test_entries_in_order() {
        let data = create_test_tar(&[
            ("a.txt", b"alpha".as_slice()),
            ("sub/b.txt", b"beta".as_slice()),
        ]);
        let mut reader = reader_for(data);
        let mut entries = reader.entries().unwrap();

        let mut first = entries.next_entry().unwrap().unwrap();
        assert_eq!(first.name(), std::path::Path::new("a.txt"));
        let mut content = String::new();
        first
            .take_reader()
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "alpha");
        drop(first);

        let second = entries.next_entry().unwrap().unwrap();
        assert_eq!(second.name(), std::path::Path::new("sub/b.txt"));
        drop(second);

        assert!(entries.next_entry().is_none());
    }

    #[test]
    fn test_directory_and_symlink_kinds() {
        let data = TarTestBuilder::new()
            .add_directory("dir/")
            .add_symlink("dir/link", "../target")
            .add_file("dir/file.txt", b"x")
            .build();
        let mut reader = reader_for(data);
        let mut entries = reader.entries().unwrap();

        let kinds: Vec<EntryKind> = std::iter::from_fn(|| {
            entries
                .next_entry()
                .map(|entry| entry.unwrap().kind())
        })
        .collect();
        assert_eq!(
            kinds,
            vec![
                EntryKind::Directory,
                EntryKind::Unsupported("symlink"),
                EntryKind::File
            ]
        );
    }

    fn drain(reader: &mut TarReader) -> Vec<Result<std::path::PathBuf>> {
        let mut entries = reader.entries().unwrap();
        std::iter::from_fn(|| {
            entries.next_entry().map(|entry| {
                entry.map(|mut entry| {
                    if let Some(mut data) = entry.take_reader() {
                        std::io::copy(&mut data, &mut std::io::sink()).unwrap();
                    }
                    entry.name().to_path_buf()
                })
            })
        })
        .collect()
    }

    #[test]
    fn test_cut_at_header_boundary_is_invalid() {
        let data = create_test_tar(&[
            ("a.txt", [1u8; 1000].as_slice()),
            ("b.txt", [2u8; 1000].as_slice()),
        ]);
        // Header plus two data blocks: the first entry exactly, nothing more.
        let mut reader = reader_for(data[..1536].to_vec());

        let results = drain(&mut reader);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ExtractionError::InvalidArchive(_))));
    }

    #[test]
    fn test_cut_inside_entry_data_is_invalid() {
        let data = create_test_tar(&[("big.bin", [7u8; 4096].as_slice())]);
        let mut reader = reader_for(data[..2048].to_vec());

        let results = drain(&mut reader);
        assert!(matches!(results.last(), Some(Err(ExtractionError::InvalidArchive(_)))));
    }

    #[test]
    fn test_empty_stream_is_invalid() {
        let mut reader = reader_for(Vec::new());
        let results = drain(&mut reader);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_complete_archive_ends_cleanly() {
        let data = create_test_tar(&[("a.txt", b"alpha".as_slice())]);
        let mut reader = reader_for(data);

        let results = drain(&mut reader);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }

    #[test]
    fn test_corrupt_header_reports_invalid() {
        let mut data = create_test_tar(&[("big.bin", [7u8; 4096].as_slice())]);
        // Corrupt the header checksum of the first entry.
        data[148..156].copy_from_slice(b"9999999\0");
        let mut reader = reader_for(data);
        let mut entries = reader.entries().unwrap();
        let first = entries.next_entry().unwrap();
        assert!(matches!(first, Err(ExtractionError::InvalidArchive(_))));
    }
}
