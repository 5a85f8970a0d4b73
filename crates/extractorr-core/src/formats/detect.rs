//! Archive format detection from leading bytes and file names.

use std::fmt;
use std::path::Path;

use super::compression::CompressionCodec;

/// Offset of the `ustar` magic inside a tar header block.
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";

/// Size of a tar header block; also the sniffing window.
pub const SNIFF_LEN: usize = 512;

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveType {
    /// Tar archive (uncompressed).
    Tar,
    /// Gzip-compressed tar archive.
    TarGz,
    /// Bzip2-compressed tar archive.
    TarBz2,
    /// XZ-compressed tar archive.
    TarXz,
    /// Zstd-compressed tar archive.
    TarZst,
    /// ZIP archive.
    Zip,
}

impl ArchiveType {
    /// Returns the tar variant compressed with `codec`.
    #[must_use]
    pub const fn tar_with(codec: CompressionCodec) -> Self {
        match codec {
            CompressionCodec::Gzip => Self::TarGz,
            CompressionCodec::Bzip2 => Self::TarBz2,
            CompressionCodec::Xz => Self::TarXz,
            CompressionCodec::Zstd => Self::TarZst,
        }
    }

    /// Returns the compression wrapping the tar stream, if any.
    #[must_use]
    pub const fn codec(self) -> Option<CompressionCodec> {
        match self {
            Self::TarGz => Some(CompressionCodec::Gzip),
            Self::TarBz2 => Some(CompressionCodec::Bzip2),
            Self::TarXz => Some(CompressionCodec::Xz),
            Self::TarZst => Some(CompressionCodec::Zstd),
            Self::Tar | Self::Zip => None,
        }
    }

    /// Returns the short format tag used in logs.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
            Self::TarZst => "tar.zst",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// What the leading bytes of a stream say about its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    /// ZIP local header, empty-archive or spanned signature.
    Zip,
    /// Uncompressed tar with a `ustar` header.
    Tar,
    /// A compressed stream; the payload still needs inspection.
    Compressed(CompressionCodec),
}

/// Classifies a stream prefix by magic bytes.
///
/// # Examples
///
/// ```
/// use extractorr_core::formats::detect::{Magic, sniff};
///
/// assert_eq!(sniff(b"PK\x03\x04rest"), Some(Magic::Zip));
/// assert_eq!(sniff(b"plain text"), None);
/// ```
#[must_use]
pub fn sniff(prefix: &[u8]) -> Option<Magic> {
    if prefix.starts_with(b"PK\x03\x04")
        || prefix.starts_with(b"PK\x05\x06")
        || prefix.starts_with(b"PK\x07\x08")
    {
        return Some(Magic::Zip);
    }
    if let Some(codec) = CompressionCodec::from_magic(prefix) {
        return Some(Magic::Compressed(codec));
    }
    if has_tar_magic(prefix) {
        return Some(Magic::Tar);
    }
    None
}

/// Returns `true` if `block` carries a ustar (POSIX or GNU) header magic.
#[must_use]
pub fn has_tar_magic(block: &[u8]) -> bool {
    block
        .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len())
        .is_some_and(|magic| magic == TAR_MAGIC)
}

/// Detects the archive type from a file name.
///
/// Returns `None` if the extension is not a known archive extension.
#[must_use]
pub fn detect_format(path: &Path) -> Option<ArchiveType> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();

    match extension.as_str() {
        "tar" => Some(ArchiveType::Tar),
        "tgz" => Some(ArchiveType::TarGz),
        "tbz" | "tbz2" => Some(ArchiveType::TarBz2),
        "txz" => Some(ArchiveType::TarXz),
        "tzst" => Some(ArchiveType::TarZst),
        "zip" => Some(ArchiveType::Zip),
        "gz" | "bz2" | "xz" | "zst" if stem_is_tar(path) => {
            let codec = match extension.as_str() {
                "gz" => CompressionCodec::Gzip,
                "bz2" => CompressionCodec::Bzip2,
                "xz" => CompressionCodec::Xz,
                _ => CompressionCodec::Zstd,
            };
            Some(ArchiveType::tar_with(codec))
        }
        _ => None,
    }
}

fn stem_is_tar(path: &Path) -> bool {
    path.file_stem()
        .map(Path::new)
        .and_then(Path::extension)
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tar"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_tar() {
        let path = PathBuf::from("archive.tar");
        assert_eq!(detect_format(&path), Some(ArchiveType::Tar));
    }

    #[test]
    fn test_detect_tar_gz() {
        assert_eq!(
            detect_format(Path::new("archive.tar.gz")),
            Some(ArchiveType::TarGz)
        );
        assert_eq!(
            detect_format(Path::new("archive.tgz")),
            Some(ArchiveType::TarGz)
        );
    }

    #[test]
    fn test_detect_compressed_tar_variants() {
        assert_eq!(
            detect_format(Path::new("a.tar.bz2")),
            Some(ArchiveType::TarBz2)
        );
        assert_eq!(detect_format(Path::new("a.tbz2")), Some(ArchiveType::TarBz2));
        assert_eq!(detect_format(Path::new("a.tar.xz")), Some(ArchiveType::TarXz));
        assert_eq!(detect_format(Path::new("a.txz")), Some(ArchiveType::TarXz));
        assert_eq!(
            detect_format(Path::new("a.tar.zst")),
            Some(ArchiveType::TarZst)
        );
    }

    #[test]
    fn test_bare_compressed_file_is_not_an_archive() {
        assert_eq!(detect_format(Path::new("notes.txt.gz")), None);
        assert_eq!(detect_format(Path::new("dump.xz")), None);
    }

    #[test]
    fn test_detect_case_insensitive() {
        assert_eq!(detect_format(Path::new("ARCHIVE.ZIP")), Some(ArchiveType::Zip));
        assert_eq!(
            detect_format(Path::new("Bundle.TAR.GZ")),
            Some(ArchiveType::TarGz)
        );
    }

    #[test]
    fn test_detect_unsupported() {
        assert_eq!(detect_format(Path::new("archive.rar")), None);
        assert_eq!(detect_format(Path::new("README")), None);
    }

    #[test]
    fn test_sniff_zip_signatures() {
        assert_eq!(sniff(b"PK\x03\x04"), Some(Magic::Zip));
        assert_eq!(sniff(b"PK\x05\x06"), Some(Magic::Zip));
        assert_eq!(sniff(b"PK\x07\x08"), Some(Magic::Zip));
        assert_eq!(sniff(b"PK"), None);
    }

    #[test]
    fn test_sniff_tar_header() {
        let mut block = [0u8; SNIFF_LEN];
        block[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 6].copy_from_slice(b"ustar\0");
        assert_eq!(sniff(&block), Some(Magic::Tar));
        assert!(!has_tar_magic(&block[..100]));
    }

    #[test]
    fn test_sniff_compressed() {
        assert_eq!(
            sniff(&[0x1F, 0x8B, 0x08, 0x00]),
            Some(Magic::Compressed(CompressionCodec::Gzip))
        );
    }

    #[test]
    fn test_archive_type_tag() {
        assert_eq!(ArchiveType::TarGz.to_string(), "tar.gz");
        assert_eq!(ArchiveType::Zip.codec(), None);
        assert_eq!(
            ArchiveType::tar_with(CompressionCodec::Xz).codec(),
            Some(CompressionCodec::Xz)
        );
    }
}
