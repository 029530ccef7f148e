//! Logging setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! whoever embeds it.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a stderr `fmt` subscriber honoring `RUST_LOG`.
///
/// Stdout stays reserved for step lines, reports, and JSON output.
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    init_tracing_with(DEFAULT_FILTER)
}

/// Like [`init_tracing`] with a caller-chosen fallback filter.
pub fn init_tracing_with(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
