//! Per-archive output directory naming.

use std::path::Path;
use std::path::PathBuf;

use super::DestDir;
use crate::ExtractionError;
use crate::Result;

/// The directory one source archive is extracted into:
/// `output_dir/<file name without archive extension>`.
///
/// # Examples
///
/// ```
/// use extractorr_core::types::OutputRoot;
/// use std::path::Path;
///
/// let root = OutputRoot::derive(Path::new("/out"), Path::new("/in/bundle.tar.gz")).unwrap();
/// assert_eq!(root.as_path(), Path::new("/out/bundle"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputRoot(PathBuf);

impl OutputRoot {
    /// Derives the output root for `source`. Touches no filesystem.
    ///
    /// # Errors
    ///
    /// Returns `NotAFile` if `source` has no file name component.
    pub fn derive(output_dir: &Path, source: &Path) -> Result<Self> {
        let name = source
            .file_name()
            .ok_or_else(|| ExtractionError::NotAFile {
                path: source.to_path_buf(),
            })?;
        Ok(Self(output_dir.join(strip_archive_extension(Path::new(name)))))
    }

    /// Returns the output root path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Creates the directory (and ancestors) and returns it canonicalized.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error if the directory cannot be created.
    pub fn ensure(&self) -> Result<DestDir> {
        DestDir::create(&self.0)
    }
}

/// Strips the archive extension from a file name.
///
/// The last extension is removed, then a remaining `.tar` if present:
/// `bundle.tar.gz` gives `bundle`, `data.zip` gives `data`, and a name
/// without extension is returned unchanged.
#[must_use]
pub fn strip_archive_extension(name: &Path) -> &Path {
    let Some(stem) = name.file_stem().map(Path::new) else {
        return name;
    };
    let is_tar = stem
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tar"));
    if is_tar {
        stem.file_stem().map_or(stem, Path::new)
    } else {
        stem
    }
}
