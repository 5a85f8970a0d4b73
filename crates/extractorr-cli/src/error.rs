//! Error conversion utilities for CLI.
//!
//! Converts extractorr-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use extractorr_core::ConfigError;
use extractorr_core::watch::WatchError;

/// Converts `ConfigError` to an anyhow error naming the setting to fix.
pub fn convert_config_error(err: ConfigError) -> anyhow::Error {
    match err {
        ConfigError::NotADirectory { label, path } => anyhow!(
            "{label} is not a directory: {}\n\
             HINT: Set {label} (or --{}) to an existing directory.",
            path.display(),
            label.to_ascii_lowercase().replace('_', "-")
        ),
        ConfigError::Invalid(reason) => anyhow!(
            "Invalid configuration: {reason}\n\
             HINT: Check the RETRY_* settings and directory permissions."
        ),
    }
}

/// Converts `WatchError` to an anyhow error with platform guidance.
pub fn convert_watch_error(err: WatchError) -> anyhow::Error {
    match err {
        WatchError::Init(source) => anyhow!(
            "Failed to initialize the filesystem watcher: {source}\n\
             HINT: The inotify instance limit may be exhausted \
             (fs.inotify.max_user_instances)."
        ),
        WatchError::Watch { path, source } => anyhow!(
            "Cannot watch '{}': {source}\n\
             HINT: Check that WATCH_DIR exists and is readable.",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_convert_not_a_directory() {
        let err = ConfigError::NotADirectory {
            label: "WATCH_DIR",
            path: PathBuf::from("/missing"),
        };
        let msg = format!("{:?}", convert_config_error(err));
        assert!(msg.contains("WATCH_DIR is not a directory: /missing"));
        assert!(msg.contains("--watch-dir"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_invalid() {
        let err = ConfigError::Invalid("retry attempts must be at least 1".into());
        let msg = format!("{:?}", convert_config_error(err));
        assert!(msg.contains("retry attempts"));
    }

    #[test]
    fn test_convert_watch_error() {
        let err = WatchError::Watch {
            path: PathBuf::from("/in"),
            source: notify::Error::path_not_found(),
        };
        let msg = format!("{:?}", convert_watch_error(err));
        assert!(msg.contains("Cannot watch '/in'"));
    }
}
