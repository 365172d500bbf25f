//! Logging initialization.
//!
//! The library only emits `tracing` events; binaries and tests that want to
//! see them call [`init`] once.

use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    init_with_filter(&filter)
}

pub fn init_with_filter(filter: &str) -> bool {
    subscriber(filter).try_init().is_ok()
}

/// An invalid `filter` falls back to `info`.
fn subscriber(filter: &str) -> impl Subscriber + Send + Sync + 'static {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
}
