//! Diagnostic logging to stderr.
//!
//! The walkthrough itself is printed to stdout; this only carries `tracing`
//! events and the `log` records emitted by `rg-azure`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset. Errors only, so the console shows
/// nothing but the walkthrough.
pub const DEFAULT_FILTER: &str = "error";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging() -> bool {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(env_filter())
        .try_init()
        .is_ok()
}
