//! Remediation Engine Configuration

use std::str::FromStr;
use triage_core::{Result, TriageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Simulated,
    Real,
}

impl FromStr for ExecutionMode {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "simulated" | "demo" => Ok(Self::Simulated),
            "real" => Ok(Self::Real),
            other => Err(TriageError::Config(format!("Invalid EXECUTION_MODE: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MttrPolicyKind {
    Fixed,
    WallClock,
}

impl FromStr for MttrPolicyKind {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "wall_clock" | "wallclock" => Ok(Self::WallClock),
            other => Err(TriageError::Config(format!("Invalid MTTR_POLICY: {other}"))),
        }
    }
}

/// What `ingest` does when an alert id is already known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertIdPolicy {
    /// Replace the stored alert, keeping its list position
    #[default]
    Overwrite,
    /// Fail with a duplicate-alert error
    RequireUnique,
}

impl FromStr for AlertIdPolicy {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "require_unique" | "unique" => Ok(Self::RequireUnique),
            other => Err(TriageError::Config(format!("Invalid ALERT_ID_POLICY: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub http_bind: String,
    /// None when no API key is set; analysis is then unavailable.
    pub gemini: Option<GeminiConfig>,
    pub execution_mode: ExecutionMode,
    pub execution_timeout_secs: u64,
    pub powershell_bin: String,
    pub bash_bin: String,
    pub mttr_policy: MttrPolicyKind,
    pub mttr_fixed_minutes: u32,
    pub alert_id_policy: AlertIdPolicy,
    pub seed_alert_path: Option<String>,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let gemini = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| -> Result<GeminiConfig> {
                Ok(GeminiConfig {
                    api_key,
                    model: var("GEMINI_MODEL", "gemini-1.5-flash"),
                    base_url: var(
                        "GEMINI_BASE_URL",
                        "https://generativelanguage.googleapis.com/v1beta",
                    ),
                    request_timeout_secs: parse_number(&lookup, "GEMINI_TIMEOUT_SECS", 60)?,
                    temperature: var("GEMINI_TEMPERATURE", "0.2")
                        .parse()
                        .map_err(|e| TriageError::Config(format!("Invalid GEMINI_TEMPERATURE: {}", e)))?,
                })
            })
            .transpose()?;

        let seed_alert_path = match lookup("SEED_ALERT_PATH") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(path),
            None => Some("../data/alerts.json".to_string()),
        };

        Ok(Self {
            http_bind: var("HTTP_BIND", "0.0.0.0:8000"),
            gemini,
            execution_mode: var("EXECUTION_MODE", "simulated").parse()?,
            execution_timeout_secs: parse_number(&lookup, "EXECUTION_TIMEOUT_SECS", 300)?,
            powershell_bin: var("POWERSHELL_BIN", "powershell"),
            bash_bin: var("BASH_BIN", "bash"),
            mttr_policy: var("MTTR_POLICY", "fixed").parse()?,
            mttr_fixed_minutes: parse_number(&lookup, "MTTR_FIXED_MINUTES", 4)?,
            alert_id_policy: var("ALERT_ID_POLICY", "overwrite").parse()?,
            seed_alert_path,
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| TriageError::Config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}
