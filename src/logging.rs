//! Structured logging
//!
//! Human-readable output on stderr by default, JSON lines with `--json-logs`.
//! `CONTENT_RAIL_LOG` overrides the configured level with any `EnvFilter`
//! directive (e.g. `content_rail::release=debug`).

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "CONTENT_RAIL_LOG";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Filter from `CONTENT_RAIL_LOG`, falling back to `level`
pub fn filter_for(level: &str) -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV)
    .or_else(|_| EnvFilter::try_new(level))
    .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber once; later calls are no-ops
pub fn init(level: &str, json: bool) {
  LOGGER_INITIALIZED.get_or_init(|| {
    let filter = filter_for(level);
    let registry = tracing_subscriber::registry().with(filter);

    // Another subscriber (e.g. from a test harness) may already be installed
    let result = if json {
      registry
        .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
        .try_init()
    } else {
      registry
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .try_init()
    };
    if result.is_err() {
      tracing::debug!("global tracing subscriber already initialized");
    }
  });
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_init_is_idempotent() {
    init("debug", false);
    init("info", true);
    assert!(LOGGER_INITIALIZED.get().is_some());
  }

  #[test]
  fn test_invalid_level_falls_back() {
    let _ = filter_for("[[[");
    let _ = filter_for("content_rail=debug");
  }
}
