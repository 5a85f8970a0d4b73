//! Core extraction engine.

use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::ExtractionError;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::error::EntryOperation;
use crate::formats::traits::ArchiveEntry;
use crate::formats::traits::EntryKind;
use crate::formats::traits::EntrySource;
use crate::report::ExtractionJob;
use crate::types::DestDir;
use crate::types::OutputRoot;
use crate::types::SafePath;

/// Materializes archive entries under an output root.
///
/// The engine owns one copy buffer and reuses it for every file of every
/// archive it extracts. Entries are pulled one at a time; the first failure
/// stops the run and is recorded in the returned [`ExtractionJob`].
#[derive(Debug, Default)]
pub struct ExtractionEngine {
    buffer: CopyBuffer,
}

impl ExtractionEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts every entry of `entries` under `output_root`.
    ///
    /// The output root is created first, with its ancestors. Unsupported
    /// entry kinds are skipped and counted. Any other failure (traversal,
    /// I/O, a corrupt archive) ends the run; entries already written are
    /// left in place.
    pub fn extract(
        &mut self,
        entries: &mut dyn EntrySource,
        output_root: &OutputRoot,
        source: &Path,
    ) -> ExtractionJob {
        let start = Instant::now();
        let mut job = ExtractionJob::new(source, output_root.as_path());

        match output_root.ensure() {
            Ok(dest) => self.extract_all(entries, &dest, &mut job),
            Err(e) => job.fail(e),
        }

        job.duration = start.elapsed();
        if job.is_success() {
            info!(
                source = %source.display(),
                output = %job.output_root.display(),
                files = job.files_extracted,
                directories = job.directories_created,
                skipped = job.entries_skipped,
                bytes = job.bytes_written,
                duration_ms = job.duration.as_millis(),
                "extraction complete"
            );
        }
        job
    }

    fn extract_all(&mut self, entries: &mut dyn EntrySource, dest: &DestDir, job: &mut ExtractionJob) {
        loop {
            let entry = match entries.next_entry() {
                None => break,
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    job.fail(e);
                    break;
                }
            };

            job.entries_processed += 1;
            if let Err(e) = self.extract_entry(entry, dest, job) {
                job.fail(e);
                break;
            }
        }
    }

    fn extract_entry(
        &mut self,
        mut entry: ArchiveEntry<'_>,
        dest: &DestDir,
        job: &mut ExtractionJob,
    ) -> Result<()> {
        let safe_path = SafePath::validate(entry.name(), dest)?;
        let target = dest.join(&safe_path);

        match entry.kind() {
            EntryKind::Directory => {
                std::fs::create_dir_all(&target).map_err(|e| {
                    ExtractionError::entry_io(entry.name(), EntryOperation::CreateDirectory, e)
                })?;
                job.directories_created += 1;
                debug!(entry = %entry.name().display(), "created directory");
            }
            EntryKind::File => {
                if safe_path.is_root() {
                    return Err(ExtractionError::InvalidArchive(format!(
                        "file entry without a name: {:?}",
                        entry.name()
                    )));
                }
                let reader = entry.take_reader().ok_or_else(|| {
                    ExtractionError::entry_io(
                        entry.name(),
                        EntryOperation::OpenEntry,
                        io::Error::other("entry has no data stream"),
                    )
                })?;
                let written = self.write_file(entry.name(), reader, &target)?;
                job.files_extracted += 1;
                job.bytes_written += written;
                debug!(entry = %entry.name().display(), bytes = written, "extracted file");
            }
            EntryKind::Unsupported(kind) => {
                warn!(
                    entry = %entry.name().display(),
                    kind,
                    "skipping unsupported entry"
                );
                job.entries_skipped += 1;
            }
        }

        Ok(())
    }

    /// Creates `target` (and missing parents) and streams `reader` into it.
    ///
    /// The reader and the file are dropped on every return path.
    fn write_file(
        &mut self,
        name: &Path,
        mut reader: Box<dyn io::Read + '_>,
        target: &Path,
    ) -> Result<u64> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ExtractionError::entry_io(name, EntryOperation::CreateDirectory, e)
            })?;
        }

        let file = File::create(target)
            .map_err(|e| ExtractionError::entry_io(name, EntryOperation::CreateFile, e))?;
        let mut writer = BufWriter::new(file);

        let written = copy_with_buffer(&mut reader, &mut writer, &mut self.buffer)
            .and_then(|written| writer.flush().map(|()| written))
            .map_err(|e| ExtractionError::entry_io(name, EntryOperation::Copy, e))?;

        Ok(written)
    }
}
