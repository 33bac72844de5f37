// src/logging.rs
//!
//! Subscriber setup for the bridge binary. The library itself only emits
//! `tracing` events.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Logs go to stderr so console output on stdout stays readable.
pub fn init_tracing(default_filter: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| format!("invalid log filter {:?}: {}", default_filter, e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .map_err(|e| e.to_string())
}
