//! Tracing setup for the CLI driver.
//!
//! The library itself only ever calls `tracing::{trace,debug,info,warn,error}` —
//! it never installs a subscriber. This module is a convenience for binaries.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing-subscriber` formatter driven by `RUST_LOG`, falling
/// back to `level` when the environment variable is unset.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
