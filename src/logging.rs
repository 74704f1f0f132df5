// ABOUTME: Tracing subscriber setup for applications embedding the orchestrator.
// ABOUTME: Verbose selects debug output; RUST_LOG overrides either default.

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber. Later calls are no-ops.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
