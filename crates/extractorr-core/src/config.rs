//! Immutable runtime configuration for the watch-and-extract pipeline.
//!
//! Built once at startup and passed explicitly to the components that need
//! it; nothing in this crate reads the process environment.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

/// Exponential backoff policy for opening a source that may still be held
/// by its writer.
///
/// # Examples
///
/// ```
/// use extractorr_core::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.delay_before(2), Duration::from_secs(1));
/// assert_eq!(policy.delay_before(3), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of open attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub initial_delay: Duration,

    /// Factor applied to the delay after every failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    /// Default values:
    /// - `max_attempts`: 5
    /// - `initial_delay`: 1 second
    /// - `backoff_multiplier`: 2.0
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy from its three parameters.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
        }
    }

    /// Returns the wait before attempt number `attempt` (1-based).
    ///
    /// The first attempt is never delayed.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.powi(exponent);
        // Saturate instead of panicking on absurd multipliers.
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Checks the policy parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry attempts must be at least 1".into(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "retry backoff multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        Ok(())
    }
}

/// Whether the source archive is removed after a fully successful
/// extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Leave the source in place.
    #[default]
    Keep,
    /// Remove the source once every entry was extracted.
    Delete,
}

impl DeletePolicy {
    /// Interprets the `DELETE_FILE` setting: exactly `"yes"` enables
    /// deletion, any other value or no value disables it.
    ///
    /// ```
    /// use extractorr_core::DeletePolicy;
    ///
    /// assert_eq!(DeletePolicy::from_flag(Some("yes")), DeletePolicy::Delete);
    /// assert_eq!(DeletePolicy::from_flag(Some("true")), DeletePolicy::Keep);
    /// assert_eq!(DeletePolicy::from_flag(None), DeletePolicy::Keep);
    /// ```
    #[must_use]
    pub fn from_flag(value: Option<&str>) -> Self {
        match value {
            Some("yes") => Self::Delete,
            _ => Self::Keep,
        }
    }

    /// Returns `true` if deletion is enabled.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Delete)
    }
}

/// Configuration error raised while validating a [`WatchConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required directory does not exist or is not a directory.
    #[error("{label} is not a directory: {path}")]
    NotADirectory {
        /// Which setting was wrong.
        label: &'static str,
        /// The configured path.
        path: PathBuf,
    },

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Full pipeline configuration.
///
/// # Examples
///
/// ```
/// use extractorr_core::{DeletePolicy, WatchConfig};
///
/// let config = WatchConfig::new("/in", "/out").with_delete_policy(DeletePolicy::Delete);
/// assert!(config.delete_policy.is_enabled());
/// ```
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory watched for new archives (non-recursive).
    pub watch_dir: PathBuf,

    /// Root under which each archive gets its own output directory.
    pub output_dir: PathBuf,

    /// Source removal after successful extraction.
    pub delete_policy: DeletePolicy,

    /// Backoff used when opening a source.
    pub retry: RetryPolicy,

    /// Treat archives already present in `watch_dir` at startup as written.
    pub scan_existing: bool,
}

impl WatchConfig {
    /// Creates a configuration with default retry and delete settings.
    #[must_use]
    pub fn new(watch_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            output_dir: output_dir.into(),
            delete_policy: DeletePolicy::default(),
            retry: RetryPolicy::default(),
            scan_existing: false,
        }
    }

    /// Sets the delete policy.
    #[must_use]
    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enables or disables the startup scan of `watch_dir`.
    #[must_use]
    pub fn with_scan_existing(mut self, scan: bool) -> Self {
        self.scan_existing = scan;
        self
    }

    /// Validates the configuration.
    ///
    /// The watch directory must exist. The output directory is created if
    /// missing, since extraction would create it anyway.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_dir("WATCH_DIR", &self.watch_dir)?;
        if !self.output_dir.exists() {
            std::fs::create_dir_all(&self.output_dir).map_err(|e| {
                ConfigError::Invalid(format!(
                    "cannot create OUTPUT_DIR {}: {e}",
                    self.output_dir.display()
                ))
            })?;
        }
        require_dir("OUTPUT_DIR", &self.output_dir)?;
        self.retry.validate()
    }
}

fn require_dir(label: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ConfigError::NotADirectory {
            label,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_delay_grows_exponentially() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100), 3.0);
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(100));
        assert_eq!(policy.delay_before(3), Duration::from_millis(300));
        assert_eq!(policy.delay_before(4), Duration::from_millis(900));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_secs(1), 1e300);
        assert_eq!(policy.delay_before(10), Duration::MAX);
    }

    #[test]
    fn test_invalid_retry_policy() {
        assert!(
            RetryPolicy::new(0, Duration::from_secs(1), 2.0)
                .validate()
                .is_err()
        );
        assert!(
            RetryPolicy::new(3, Duration::from_secs(1), 0.5)
                .validate()
                .is_err()
        );
        assert!(
            RetryPolicy::new(3, Duration::from_secs(1), f64::NAN)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_delete_policy_flag() {
        assert_eq!(DeletePolicy::from_flag(Some("yes")), DeletePolicy::Delete);
        assert_eq!(DeletePolicy::from_flag(Some("YES")), DeletePolicy::Keep);
        assert_eq!(DeletePolicy::from_flag(Some("no")), DeletePolicy::Keep);
        assert_eq!(DeletePolicy::from_flag(Some("")), DeletePolicy::Keep);
        assert_eq!(DeletePolicy::from_flag(None), DeletePolicy::Keep);
    }

    #[test]
    fn test_validate_creates_output_dir() {
        let temp = TempDir::new().unwrap();
        let watch = temp.path().join("in");
        std::fs::create_dir(&watch).unwrap();
        let output = temp.path().join("out/nested");

        let config = WatchConfig::new(&watch, &output);
        config.validate().unwrap();
        assert!(output.is_dir());
    }

    #[test]
    fn test_validate_missing_watch_dir() {
        let temp = TempDir::new().unwrap();
        let config = WatchConfig::new(temp.path().join("missing"), temp.path());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotADirectory {
                label: "WATCH_DIR",
                ..
            })
        ));
    }

    #[test]
    fn test_output_dir_is_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("out");
        std::fs::write(&file, "x").unwrap();
        let config = WatchConfig::new(temp.path(), &file);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotADirectory {
                label: "OUTPUT_DIR",
                ..
            })
        ));
    }
}
