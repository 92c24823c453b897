use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSettings;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a
/// subscriber is already installed.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let registry = tracing_subscriber::registry().with(filter);

    match settings.format.as_str() {
        "pretty" => registry.with(fmt::layer().pretty().with_target(false)).try_init(),
        "json" => registry.with(fmt::layer().json().with_target(false)).try_init(),
        _ => registry.with(fmt::layer().with_target(false)).try_init(),
    }
}
