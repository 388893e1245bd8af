//! Logging and tracing initialization.
//!
//! Call [`init_logging`] once at startup, before building the [`App`](crate::App).
//! The filter comes from `RUST_LOG` when set:
//!
//! ```bash
//! # Show request traces
//! RUST_LOG=keystone_core=debug,tower_http=debug cargo run
//!
//! # Quiet production output
//! RUST_LOG=warn cargo run
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, LogFormat};

const DEFAULT_FILTER: &str = "info,tower_http=debug,sqlx=warn";

/// Initialize the global subscriber using the format chosen in `config`,
/// then emit a startup event carrying the app name, version and environment.
///
/// Returns `false` when a subscriber was already installed (tests call this
/// repeatedly; the first one wins).
pub fn init_logging(config: &Config) -> bool {
    let installed = init_logging_with_format(config.log_format, DEFAULT_FILTER);
    tracing::info!(
        app = %config.app_name,
        version = %config.app_version,
        environment = config.environment.as_str(),
        "logger initialized"
    );
    installed
}

/// Initialize logging with a specific format and a fallback filter used when
/// `RUST_LOG` is unset.
pub fn init_logging_with_format(format: LogFormat, fallback_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_line_number(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
    };

    result.is_ok()
}

/// Quiet subscriber for tests. Honors `RUST_LOG`, defaults to `warn`.
pub fn init_test_logging() {
    let _ = init_logging_with_format(LogFormat::Compact, "warn");
}
