//! Archive format detection and entry readers.
//!
//! Supported containers are zip and tar, the latter optionally wrapped in
//! gzip, bzip2, xz or zstd.

pub mod classify;
pub mod compression;
pub mod detect;
pub mod service;
pub mod tar;
pub mod traits;
pub mod zip;

pub use classify::FormatClassifier;
pub use compression::CompressionCodec;
pub use detect::ArchiveType;
pub use detect::detect_format;
pub use service::CodecArchiveService;
pub use traits::ArchiveEntry;
pub use traits::ArchiveHandle;
pub use traits::ArchiveReader;
pub use traits::ArchiveService;
pub use traits::EntryKind;
pub use traits::EntrySource;
