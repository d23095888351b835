//! Telemetry Configuration

use std::str::FromStr;

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    /// Accepts the `JSON_LOGS` switch values as well as format names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "json" => Ok(Self::Json),
            "false" | "0" | "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// Fallback directive when `RUST_LOG` is absent or unparsable
    pub default_directive: String,
    pub format: LogFormat,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            default_directive: "info".to_string(),
            format: LogFormat::Json,
        }
    }

    pub fn from_env(default_service_name: &str) -> Self {
        Self::from_lookup(default_service_name, |key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. An unrecognised `JSON_LOGS`
    /// value keeps JSON output.
    pub fn from_lookup<F>(default_service_name: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(
            lookup("SERVICE_NAME")
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| default_service_name.to_string()),
        );
        if let Some(directive) = lookup("RUST_LOG").filter(|d| !d.is_empty()) {
            config.default_directive = directive;
        }
        if let Some(format) = lookup("JSON_LOGS").and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        config
    }
}
