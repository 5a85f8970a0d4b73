//! CLI argument parsing using clap.
//!
//! Every option can also come from the environment (or a `.env` file loaded
//! before parsing), which is how the agent is usually deployed.

use clap::ArgAction;
use clap::Parser;
use extractorr_core::DeletePolicy;
use extractorr_core::RetryPolicy;
use extractorr_core::WatchConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "extractorr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to watch for new archives (not recursive)
    #[arg(long, env = "WATCH_DIR", value_name = "DIR")]
    pub watch_dir: PathBuf,

    /// Directory under which each archive is extracted
    #[arg(long, env = "OUTPUT_DIR", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Set to "yes" to delete archives after a successful extraction
    #[arg(long, env = "DELETE_FILE", value_name = "yes|no")]
    pub delete_file: Option<String>,

    /// Maximum attempts to open an archive that is still being written
    #[arg(
        long,
        env = "RETRY_ATTEMPTS",
        default_value = "5",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub retry_attempts: u32,

    /// Delay before the second open attempt, in milliseconds
    #[arg(long, env = "RETRY_DELAY_MS", default_value = "1000")]
    pub retry_delay_ms: u64,

    /// Factor applied to the delay after each failed attempt
    #[arg(long, env = "RETRY_BACKOFF", default_value = "2.0", value_parser = parse_backoff)]
    pub retry_backoff: f64,

    /// Process archives already present in the watch directory at startup
    #[arg(long, env = "SCAN_EXISTING", action = ArgAction::SetTrue)]
    pub scan_existing: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Builds the pipeline configuration. Does not validate it.
    pub fn to_config(&self) -> WatchConfig {
        WatchConfig::new(&self.watch_dir, &self.output_dir)
            .with_delete_policy(DeletePolicy::from_flag(self.delete_file.as_deref()))
            .with_retry(RetryPolicy::new(
                self.retry_attempts,
                Duration::from_millis(self.retry_delay_ms),
                self.retry_backoff,
            ))
            .with_scan_existing(self.scan_existing)
    }
}

fn parse_backoff(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid backoff multiplier: {s}"))?;
    if value.is_finite() && value >= 1.0 {
        Ok(value)
    } else {
        Err(format!("backoff multiplier must be >= 1.0, got {s}"))
    }
}
