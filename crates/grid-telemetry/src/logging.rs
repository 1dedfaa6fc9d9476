//! Structured logging initialization.

use crate::error::TelemetryResult;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Output format follows `RUST_ENV`: newline-delimited JSON under
/// `production` (for log shippers), human-readable pretty output
/// otherwise. `RUST_LOG` overrides the default filter.
pub fn init_logging() -> TelemetryResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,grid=debug"));

    let production = matches!(std::env::var("RUST_ENV").as_deref(), Ok("production"));

    let registry = tracing_subscriber::registry().with(filter);
    if production {
        registry
            .with(fmt::layer().json().flatten_event(true).with_target(true))
            .init();
    } else {
        registry
            .with(fmt::layer().pretty().with_target(true))
            .init();
    }

    Ok(())
}
