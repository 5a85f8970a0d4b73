//! Log subscriber setup.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Default level for the given verbosity flags.
fn default_level(verbose: bool, quiet: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    }
}

/// Installs the global `fmt` subscriber. `RUST_LOG` takes precedence over
/// the verbosity flags.
pub fn init(verbose: bool, quiet: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level(verbose, quiet).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
