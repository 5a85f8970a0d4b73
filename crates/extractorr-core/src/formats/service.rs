//! Built-in archive service backed by the `tar`, `zip` and codec crates.

use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;

use tracing::debug;

use super::compression::CompressionCodec;
use super::detect::ArchiveType;
use super::detect::Magic;
use super::detect::SNIFF_LEN;
use super::detect::detect_format;
use super::detect::has_tar_magic;
use super::detect::sniff;
use super::tar::TarReader;
use super::traits::ArchiveHandle;
use super::traits::ArchiveService;
use super::zip::ZipReader;
use crate::ExtractionError;
use crate::Result;

/// Recognizes zip and (optionally compressed) tar streams.
///
/// The leading bytes decide. When they are inconclusive, as for v7 tar
/// archives without a `ustar` header, the file name's extension does.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecArchiveService;

impl CodecArchiveService {
    /// Creates the service.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ArchiveService for CodecArchiveService {
    fn identify(&self, path: &Path, mut file: File) -> Result<ArchiveHandle> {
        let prefix = read_prefix(&mut file)?;
        file.seek(SeekFrom::Start(0))?;

        let by_name = detect_format(path);
        let unsupported = || ExtractionError::UnsupportedFormat {
            path: path.to_path_buf(),
        };

        match sniff(&prefix) {
            Some(Magic::Zip) => {
                let reader = ZipReader::new(file)?;
                Ok(ArchiveHandle::new(ArchiveType::Zip, Box::new(reader)))
            }
            Some(Magic::Tar) => Ok(tar_handle(ArchiveType::Tar, Box::new(file))),
            Some(Magic::Compressed(codec)) => {
                let format = ArchiveType::tar_with(codec);
                let looks_like_tar = payload_is_tar(codec, &mut file);
                file.seek(SeekFrom::Start(0))?;

                if looks_like_tar || by_name == Some(format) {
                    let stream = codec.decoder(file)?;
                    Ok(tar_handle(format, stream))
                } else {
                    debug!(
                        path = %path.display(),
                        codec = codec.name(),
                        "compressed stream does not hold a tar archive"
                    );
                    Err(unsupported())
                }
            }
            None if by_name == Some(ArchiveType::Tar) && prefix.len() >= SNIFF_LEN => {
                Ok(tar_handle(ArchiveType::Tar, Box::new(file)))
            }
            None => Err(unsupported()),
        }
    }
}

fn tar_handle(format: ArchiveType, stream: Box<dyn Read + Send>) -> ArchiveHandle {
    ArchiveHandle::new(format, Box::new(TarReader::new(stream)))
}

/// Reads up to [`SNIFF_LEN`] bytes, fewer only at end of stream.
fn read_prefix<R: Read>(reader: R) -> io::Result<Vec<u8>> {
    let mut prefix = Vec::with_capacity(SNIFF_LEN);
    reader.take(SNIFF_LEN as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}

/// Decodes the first block of a compressed stream and checks for a tar
/// header. Decoder errors count as "not tar".
fn payload_is_tar(codec: CompressionCodec, file: &mut File) -> bool {
    codec
        .decoder(file)
        .and_then(read_prefix)
        .is_ok_and(|block| has_tar_magic(&block))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::formats::compression::CompressionCodec;
    use crate::test_utils::compress;
    use crate::test_utils::create_archive;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(data)
            .unwrap();
        path
    }

    fn identify(path: &Path) -> Result<ArchiveHandle> {
        let file = File::open(path).unwrap();
        CodecArchiveService::new().identify(path, file)
    }

    #[test]
    fn test_identifies_every_format_by_content() {
        let temp = TempDir::new().unwrap();
        for format in [
            ArchiveType::Tar,
            ArchiveType::TarGz,
            ArchiveType::TarBz2,
            ArchiveType::TarXz,
            ArchiveType::TarZst,
            ArchiveType::Zip,
        ] {
            let data = create_archive(format, &[("a.txt", b"alpha".as_slice())]);
            // Misleading name: content decides.
            let path = write_file(&temp, &format!("upload-{}.bin", format.tag()), &data);
            let handle = identify(&path).unwrap();
            assert_eq!(handle.format(), format);
        }
    }

    #[test]
    fn test_handle_yields_entries() {
        let temp = TempDir::new().unwrap();
        let data = create_archive(ArchiveType::TarGz, &[("a.txt", b"alpha".as_slice())]);
        let path = write_file(&temp, "bundle.tar.gz", &data);

        let mut handle = identify(&path).unwrap();
        let mut entries = handle.entries().unwrap();
        let entry = entries.next_entry().unwrap().unwrap();
        assert_eq!(entry.name(), Path::new("a.txt"));
    }

    #[test]
    fn test_plain_gzip_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let data = compress(CompressionCodec::Gzip, b"just some log lines\n");
        let path = write_file(&temp, "server.log.gz", &data);

        let result = identify(&path);
        assert!(matches!(
            result,
            Err(ExtractionError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_text_file_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "notes.txt", b"hello");
        assert!(matches!(
            identify(&path),
            Err(ExtractionError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_short_file_named_tar_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "tiny.tar", b"not really");
        assert!(matches!(
            identify(&path),
            Err(ExtractionError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_empty_file_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "empty.zip", b"");
        assert!(matches!(
            identify(&path),
            Err(ExtractionError::UnsupportedFormat { .. })
        ));
    }
}
