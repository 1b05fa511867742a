// src/logging.rs

//! Logging setup for `stagepipe` using `tracing` + `tracing-subscriber`.
//!
//! The log level is taken from the `STAGEPIPE_LOG` environment variable
//! (e.g. "info", "debug", or a full `EnvFilter` directive), defaulting to
//! `info`.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global logging subscriber.
///
/// Safe to call once at startup; calling it a second time panics, so the
/// embedding orchestrator should own the single call.
pub fn init_logging() -> Result<()> {
    let filter =
        EnvFilter::try_from_env("STAGEPIPE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}
