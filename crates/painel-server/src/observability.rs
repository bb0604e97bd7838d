//! Log output for the dashboard server.
//!
//! Logging starts at `info` before the configuration is read, so config
//! errors are reported too. Once `logging.level` is known it replaces the
//! startup filter in place. An explicit `RUST_LOG` always wins: neither the
//! startup level nor the configured one override it.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER: OnceLock<FilterHandle> = OnceLock::new();

/// Installs the global subscriber at `info`.
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Installs the global subscriber at `level`.
///
/// Calling it again is a no-op; the first subscriber stays installed.
pub fn init_tracing_with_level(level: &str) {
    let filter = rust_log_filter().unwrap_or_else(|| EnvFilter::new(level));
    let (layer, handle) = reload::Layer::new(filter);
    if FILTER.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(fmt::layer())
        .try_init();
}

/// Switches the running filter to the configured `level`.
///
/// Ignored when `RUST_LOG` is set or no subscriber was installed here.
pub fn apply_logging_level(level: &str) {
    if rust_log_filter().is_some() {
        return;
    }
    let Some(handle) = FILTER.get() else {
        return;
    };
    if let Err(e) = handle.modify(|filter| *filter = EnvFilter::new(level)) {
        tracing::warn!(error = %e, level, "could not change log level");
    } else {
        tracing::debug!(level, "log level applied");
    }
}

/// The filter from `RUST_LOG`, if it is set and parses.
fn rust_log_filter() -> Option<EnvFilter> {
    std::env::var_os(EnvFilter::DEFAULT_ENV)?;
    EnvFilter::try_from_default_env().ok()
}
