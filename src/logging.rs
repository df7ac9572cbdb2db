//! Log subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Default filter for the given verbosity flags.
///
/// `-q` keeps errors only, no flag shows warnings and stage summaries,
/// `-v` adds per-stage debug output and `-vv` traces everything.
pub fn default_directive(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "captioncraft=info,warn",
        (false, 1) => "captioncraft=debug,info",
        (false, _) => "trace",
    }
}

/// Install a stderr subscriber. `RUST_LOG` wins over the verbosity flags.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init(quiet: bool, verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet, verbose)));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .try_init();
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
