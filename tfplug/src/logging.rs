//! Logging setup for provider processes
//!
//! All logs are written to **stderr**; stdout carries the plugin handshake
//! and must stay clean. `RUST_LOG` overrides the configured default level,
//! e.g. `RUST_LOG=netbox=debug,tfplug=info`.

use crate::server::LogLevel;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_str()))
}

/// Install the global subscriber, returning false if one is already set
pub fn try_init_logging(default_level: LogLevel) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

/// Like [`try_init_logging`], for callers that don't care whether a
/// subscriber was already installed
pub fn init_logging(default_level: LogLevel) {
    if !try_init_logging(default_level) {
        tracing::debug!("tracing subscriber already installed");
    }
}
