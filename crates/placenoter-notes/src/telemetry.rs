//! Tracing subscriber setup for binaries built on this crate.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a compact console subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies (INFO, or
/// DEBUG in debug builds, when `None`). Safe to call more than once: later
/// calls are ignored.
pub fn init(default_level: Option<Level>) {
    let level = default_level.unwrap_or(if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    });
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
    if result.is_ok() {
        tracing::debug!(%level, "telemetry initialized");
    }
}
