//! Logging initialization.
//!
//! The library only emits `tracing` events; the binary decides where they go.
//! Output goes to stderr so stdout stays free for data.

use crate::config::LoggingConfig;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the global subscriber.
///
/// `RUST_LOG` overrides `level` when set. Calling this twice is a no-op.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    // try_init fails only when a subscriber is already set, e.g. by a test harness.
    if json_format {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .ok();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}

/// Initialize from config, with CLI flags taking precedence.
pub fn init_from_config(config: &LoggingConfig, verbose: bool, json_logs: bool) {
    let level = if verbose { "debug" } else { config.level.as_str() };
    init(level, json_logs || config.format == "json");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init("error", false);
        init("error", true);
    }
}
