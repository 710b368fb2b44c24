//! Development-time tracing.
//!
//! Tracing goes to stderr and is filtered by `RUST_LOG`. It is not the run
//! record: `transcript.log` and `last_response.json` (`io::transcript_store`)
//! are always written, whatever the filter says.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber. Defaults to `warn` when `RUST_LOG` is unset.
///
/// ```bash
/// RUST_LOG=verigen=debug verigen run specs/ahb_lite.toml
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
