//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "fastfx=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to `default_filter`
///
/// Returns `false` if a global subscriber was already installed; calling
/// this twice is harmless.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
