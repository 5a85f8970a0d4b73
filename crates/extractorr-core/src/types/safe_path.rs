//! Validated entry path type.

use crate::ExtractionError;
use crate::Result;
use std::io;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use super::DestDir;

/// An archive-relative path proven to resolve inside a destination.
///
/// `SafePath` never contains `..`, root or prefix components, or NUL bytes.
/// `.` components are dropped. There is no `From<PathBuf>`; the only way to
/// obtain one is [`SafePath::validate`].
///
/// An empty `SafePath` denotes the destination itself, which is what an
/// entry named `./` resolves to.
///
/// # Examples
///
/// ```no_run
/// use extractorr_core::types::DestDir;
/// use extractorr_core::types::SafePath;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("/tmp/out")?;
///
/// let safe = SafePath::validate(Path::new("foo/./bar.txt"), &dest)?;
/// assert_eq!(safe.as_path(), Path::new("foo/bar.txt"));
///
/// assert!(SafePath::validate(Path::new("../etc/passwd"), &dest).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath(PathBuf);

impl SafePath {
    /// Validates `path` against `dest`.
    ///
    /// Traversal attempts are rejected, never rewritten. Besides the lexical
    /// checks, the nearest existing ancestor of the resolved path is
    /// canonicalized so that a symlink already present under `dest` cannot
    /// redirect the write elsewhere.
    ///
    /// # Errors
    ///
    /// - `PathTraversal` for `..`, absolute paths, NUL bytes, or a resolved
    ///   location outside `dest`
    /// - `Io` if an existing ancestor cannot be canonicalized
    pub fn validate(path: &Path, dest: &DestDir) -> Result<Self> {
        let traversal = || ExtractionError::PathTraversal {
            path: path.to_path_buf(),
        };

        if has_null_bytes(path) || path.is_absolute() {
            return Err(traversal());
        }

        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(traversal());
                }
            }
        }

        let resolved = dest.as_path().join(&normalized);
        if !resolved.starts_with(dest.as_path()) {
            return Err(traversal());
        }

        // Walk up to the first ancestor that exists and make sure it lives
        // inside the destination once symlinks are resolved.
        for ancestor in resolved.ancestors() {
            match ancestor.canonicalize() {
                Ok(canonical) => {
                    if !canonical.starts_with(dest.as_path()) {
                        return Err(traversal());
                    }
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // A dangling symlink exists but does not resolve.
                    if ancestor.symlink_metadata().is_ok() {
                        return Err(traversal());
                    }
                }
                Err(e) => {
                    return Err(ExtractionError::Io(io::Error::new(
                        e.kind(),
                        format!("failed to canonicalize {}: {e}", ancestor.display()),
                    )));
                }
            }
        }

        Ok(Self(normalized))
    }

    /// Returns the path as a `&Path`.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Returns `true` if the path denotes the destination itself.
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.as_os_str().is_empty()
    }
}

#[cfg(unix)]
fn has_null_bytes(path: &Path) -> bool {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().contains(&b'\0')
}

#[cfg(not(unix))]
fn has_null_bytes(path: &Path) -> bool {
    path.to_str().is_none_or(|s| s.contains('\0'))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Returns `(TempDir, DestDir)`; keep the `TempDir` alive for the test.
    fn create_test_dest() -> (TempDir, DestDir) {
        let temp = TempDir::new().expect("failed to create temp dir");
        let dest = DestDir::new(temp.path()).expect("failed to create dest");
        (temp, dest)
    }

    #[test]
    fn test_safe_path_valid_relative() {
        let (_temp, dest) = create_test_dest();
        let safe = SafePath::validate(Path::new("foo/bar/baz.txt"), &dest).expect("valid");
        assert_eq!(safe.as_path(), Path::new("foo/bar/baz.txt"));
        assert!(dest.join(&safe).starts_with(dest.as_path()));
    }

    #[test]
    fn test_safe_path_reject_parent_traversal() {
        let (_temp, dest) = create_test_dest();
        for name in ["../etc/passwd", "../../evil", "foo/../../bar", "a/b/../c"] {
            let result = SafePath::validate(Path::new(name), &dest);
            assert!(
                matches!(result, Err(ExtractionError::PathTraversal { .. })),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_safe_path_reject_absolute_unix() {
        let (_temp, dest) = create_test_dest();
        let result = SafePath::validate(Path::new("/etc/passwd"), &dest);
        assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
    }

    #[test]
    fn test_safe_path_normalize_dot_components() {
        let (_temp, dest) = create_test_dest();
        let safe = SafePath::validate(Path::new("./foo/./bar.txt"), &dest).expect("valid");
        assert_eq!(safe.as_path(), Path::new("foo/bar.txt"));
    }

    #[test]
    fn test_safe_path_root_entry() {
        let (_temp, dest) = create_test_dest();
        let safe = SafePath::validate(Path::new("./"), &dest).expect("valid");
        assert!(safe.is_root());
        assert_eq!(dest.join(&safe), dest.as_path());
    }

    #[test]
    #[cfg(unix)]
    fn test_safe_path_null_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (_temp, dest) = create_test_dest();
        let path = Path::new(OsStr::from_bytes(b"file\0.txt"));
        let result = SafePath::validate(path, &dest);
        assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
    }

    #[test]
    fn test_safe_path_unicode() {
        let (_temp, dest) = create_test_dest();
        let safe = SafePath::validate(Path::new("données/файл.txt"), &dest).expect("valid");
        assert_eq!(safe.as_path(), Path::new("données/файл.txt"));
    }

    #[test]
    #[cfg(unix)]
    fn test_symlink_in_parent_chain() {
        use std::os::unix::fs::symlink;

        let (_temp, dest) = create_test_dest();
        let outside = TempDir::new().expect("outside dir");
        symlink(outside.path(), dest.as_path().join("escape")).expect("symlink");

        for name in ["escape/file.txt", "escape/deeper/file.txt"] {
            let result = SafePath::validate(Path::new(name), &dest);
            assert!(
                matches!(result, Err(ExtractionError::PathTraversal { .. })),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_dangling_symlink_rejected() {
        use std::os::unix::fs::symlink;

        let (_temp, dest) = create_test_dest();
        symlink("/nonexistent/target", dest.as_path().join("dangling")).expect("symlink");

        let result = SafePath::validate(Path::new("dangling"), &dest);
        assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_symlink_inside_destination_allowed() {
        use std::os::unix::fs::symlink;

        let (_temp, dest) = create_test_dest();
        std::fs::create_dir(dest.as_path().join("real")).unwrap();
        symlink(dest.as_path().join("real"), dest.as_path().join("alias")).unwrap();

        assert!(SafePath::validate(Path::new("alias/file.txt"), &dest).is_ok());
    }

    #[test]
    fn test_legitimate_file_in_real_directory() {
        let (_temp, dest) = create_test_dest();
        std::fs::create_dir_all(dest.as_path().join("real/sub")).unwrap();
        std::fs::write(dest.as_path().join("real/sub/existing.txt"), "x").unwrap();

        assert!(SafePath::validate(Path::new("real/sub/existing.txt"), &dest).is_ok());
        assert!(SafePath::validate(Path::new("real/sub/new.txt"), &dest).is_ok());
    }
}
