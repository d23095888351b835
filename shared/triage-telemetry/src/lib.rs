//! Triage Telemetry
//!
//! Structured logging for the triage services, JSON unless `JSON_LOGS=false`.

mod config;
mod tracing_setup;

pub use config::{LogFormat, TelemetryConfig};
pub use tracing_setup::init_tracing;

/// Resolve telemetry settings from the environment and install the subscriber
pub fn init(default_service_name: &str) -> Result<TelemetryConfig, TelemetryError> {
    let config = TelemetryConfig::from_env(default_service_name);
    init_tracing(&config)?;
    Ok(config)
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Invalid log filter directive: {0}")]
    InvalidDirective(String),

    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),
}
