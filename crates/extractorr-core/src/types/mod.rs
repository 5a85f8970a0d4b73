//! Validated path types used during extraction.
//!
//! Entry names from an archive become filesystem paths only through
//! [`SafePath::validate`], against a [`DestDir`] obtained from an
//! [`OutputRoot`].

pub mod dest_dir;
pub mod output_root;
pub mod safe_path;

pub use dest_dir::DestDir;
pub use output_root::OutputRoot;
pub use output_root::strip_archive_extension;
pub use safe_path::SafePath;
