//! Tracing Setup

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{LogFormat, TelemetryConfig, TelemetryError};

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// directive when it parses.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_directive))
        .map_err(|e| TelemetryError::InvalidDirective(e.to_string()))?;

    let (json, pretty) = match config.format {
        LogFormat::Json => (
            Some(fmt::layer().json().with_target(true).with_thread_ids(true)),
            None,
        ),
        LogFormat::Pretty => (None, Some(fmt::layer().with_target(true))),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(pretty)
        .try_init()
        .map_err(|e| TelemetryError::TracingInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        directive = %config.default_directive,
        format = ?config.format,
        "Tracing initialized"
    );

    Ok(())
}
