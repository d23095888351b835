use remediation_engine::RemediationService;
use std::sync::Arc;
use tracing::info;
use triage_core::{Result, ServiceRuntime, TriageError};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = triage_telemetry::init("remediation-engine")
        .map_err(|e| TriageError::Config(e.to_string()))?;

    info!(service = %telemetry.service_name, "Starting Remediation Engine");

    let service = Arc::new(RemediationService::from_env().await?);
    ServiceRuntime::run(service).await?;
    Ok(())
}
