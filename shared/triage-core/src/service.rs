//! Service lifecycle shared by the triage services

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{error, info, warn};

use crate::error::Result;

/// Liveness probe payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub service_id: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Readiness probe payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessStatus {
    pub ready: bool,
    pub dependencies: Vec<DependencyStatus>,
}

impl ReadinessStatus {
    /// Ready exactly when every dependency is available.
    pub fn from_dependencies(dependencies: Vec<DependencyStatus>) -> Self {
        Self {
            ready: dependencies.iter().all(|d| d.available),
            dependencies,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub name: String,
    pub available: bool,
    pub latency_ms: Option<u64>,
}

impl DependencyStatus {
    pub fn new(name: impl Into<String>, available: bool) -> Self {
        Self {
            name: name.into(),
            available,
            latency_ms: None,
        }
    }
}

#[async_trait]
pub trait TriageService: Send + Sync + 'static {
    /// Stable identifier used in logs and probes, e.g. "remediation-engine"
    fn service_id(&self) -> &'static str;

    fn version(&self) -> &'static str;

    async fn health(&self) -> HealthStatus;

    async fn ready(&self) -> ReadinessStatus;

    /// Serve until the listener fails. Returning is treated as a stop.
    async fn start(&self) -> Result<()>;

    async fn shutdown(&self) -> Result<()>;
}

/// How a service run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Signal,
    ServerExited,
}

pub struct ServiceRuntime;

impl ServiceRuntime {
    /// Drive a service until a shutdown signal arrives or `start` returns.
    /// A failed `start` is returned to the caller after `shutdown` runs.
    pub async fn run<S: TriageService>(service: Arc<S>) -> Result<StopReason> {
        let started = Instant::now();
        info!(
            service_id = service.service_id(),
            version = service.version(),
            "Starting service"
        );

        let server = service.clone();
        let mut serving = tokio::spawn(async move { server.start().await });

        let (reason, outcome) = tokio::select! {
            _ = shutdown_signal() => {
                info!("Shutdown signal received");
                serving.abort();
                (StopReason::Signal, Ok(()))
            }
            joined = &mut serving => {
                let outcome = match joined {
                    Ok(result) => result,
                    Err(e) => Err(crate::TriageError::Server(e.to_string())),
                };
                if let Err(e) = &outcome {
                    error!(error = %e, fatal = e.is_fatal(), "Service stopped with error");
                }
                (StopReason::ServerExited, outcome)
            }
        };

        if let Err(e) = service.shutdown().await {
            warn!(error = %e, "Error during shutdown");
        }

        info!(
            uptime_seconds = started.elapsed().as_secs(),
            reason = ?reason,
            "Service stopped"
        );

        outcome.map(|_| reason)
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM. A handler that cannot be
/// installed never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
