//! Diagnostics on stderr via `tracing`.
//!
//! The corpus itself never goes through here; samples are written by
//! `io::corpus` and the run summary is printed to stdout by the binary.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `verbosity` picks the level:
/// 0 is `warn`, 1 is `info`, 2 or more is `debug`.
///
/// # Example
/// ```bash
/// RUST_LOG=argsfuzz=debug argsfuzz generate tool.json -n 10
/// ```
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}
