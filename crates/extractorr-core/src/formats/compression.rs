//! Compression codecs wrapping tar streams.
//!
//! # Supported Codecs
//!
//! - **Gzip** (.tar.gz, .tgz)
//! - **Bzip2** (.tar.bz2, .tbz2)
//! - **Xz** (.tar.xz, .txz)
//! - **Zstd** (.tar.zst, .tzst)

use std::io;
use std::io::Read;

/// Compression codec for tar archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionCodec {
    /// Gzip compression (deflate algorithm).
    Gzip,
    /// Bzip2 compression (Burrows-Wheeler algorithm).
    Bzip2,
    /// Xz compression (LZMA2 algorithm).
    Xz,
    /// Zstd compression (Zstandard algorithm).
    Zstd,
}

const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xB5, 0x2F, 0xFD];

impl CompressionCodec {
    /// Identifies a codec from the first bytes of a stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use extractorr_core::formats::compression::CompressionCodec;
    ///
    /// assert_eq!(
    ///     CompressionCodec::from_magic(&[0x1F, 0x8B, 0x08]),
    ///     Some(CompressionCodec::Gzip)
    /// );
    /// assert_eq!(CompressionCodec::from_magic(b"PK\x03\x04"), None);
    /// ```
    #[must_use]
    pub fn from_magic(prefix: &[u8]) -> Option<Self> {
        if prefix.starts_with(GZIP_MAGIC) {
            Some(Self::Gzip)
        } else if prefix.starts_with(BZIP2_MAGIC) {
            Some(Self::Bzip2)
        } else if prefix.starts_with(XZ_MAGIC) {
            Some(Self::Xz)
        } else if prefix.starts_with(ZSTD_MAGIC) {
            Some(Self::Zstd)
        } else {
            None
        }
    }

    /// Wraps `reader` in a streaming decoder for this codec.
    ///
    /// Multi-member gzip, bzip2 and xz streams are decoded in full.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder cannot be initialized.
    pub fn decoder<'a, R>(self, reader: R) -> io::Result<Box<dyn Read + Send + 'a>>
    where
        R: Read + Send + 'a,
    {
        Ok(match self {
            Self::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Self::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            Self::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)),
            Self::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }

    /// Returns a human-readable name for this codec.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }
}
