//! Diagnostic tracing for validation runs.
//!
//! Events go to stderr so stdout stays reserved for the run summary. The JSON
//! report (`--report`) is written regardless of `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `info` so each validation error is shown.
///
/// # Example
/// ```bash
/// RUST_LOG=stepcheck=debug stepcheck validate specs/login.spec
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
