//! Logging setup shared by the binaries.
//!
//! Logs go to stderr so that JSON reports on stdout stay machine-readable.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "callgrade=debug,callgrade_core=debug"
    } else {
        "callgrade=info,callgrade_core=info"
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `verbose`.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}
