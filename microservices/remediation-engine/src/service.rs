//! Service wiring: configuration resolved once at startup, collaborators
//! built from it and injected into the orchestrator.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use triage_core::{
    DependencyStatus, HealthStatus, ReadinessStatus, Result, TriageError, TriageService,
};

use crate::api::{self, AppState};
use crate::config::{EngineConfig, ExecutionMode, MttrPolicyKind};
use crate::mttr::{FixedMttr, MttrPolicy, WallClockMttr};
use crate::planner::{GeminiPlanGenerator, PlanGenerator};
use crate::remediation::{RemediationOrchestrator, Stores};
use crate::runner::{ProcessRunner, Runner, SimulatedRunner};
use crate::seed;

pub struct RemediationService {
    config: EngineConfig,
    orchestrator: Arc<RemediationOrchestrator>,
    start_time: std::time::Instant,
}

impl RemediationService {
    pub async fn from_env() -> Result<Self> {
        let config = EngineConfig::from_env()?;
        let service = Self::new(config, Stores::in_memory())?;

        if let Some(path) = service.config.seed_alert_path.as_deref() {
            seed::load_seed_alerts(&service.orchestrator, path).await;
        }

        Ok(service)
    }

    pub fn new(config: EngineConfig, stores: Stores) -> Result<Self> {
        // A generator that fails to build leaves analysis unavailable rather
        // than stopping the service.
        let generator: Option<Arc<dyn PlanGenerator>> = match config.gemini.as_ref() {
            Some(gemini) => match GeminiPlanGenerator::new(gemini) {
                Ok(generator) => Some(Arc::new(generator)),
                Err(e) => {
                    warn!(error = %e, "Gemini plan generator initialization failed");
                    None
                }
            },
            None => {
                warn!("GEMINI_API_KEY not set; analysis disabled");
                None
            }
        };

        let runner: Arc<dyn Runner> = match config.execution_mode {
            ExecutionMode::Simulated => Arc::new(SimulatedRunner::new()),
            ExecutionMode::Real => {
                warn!("Real script execution enabled");
                Arc::new(
                    ProcessRunner::new(Duration::from_secs(config.execution_timeout_secs))
                        .with_interpreters(config.powershell_bin.clone(), config.bash_bin.clone()),
                )
            }
        };

        let mttr: Arc<dyn MttrPolicy> = match config.mttr_policy {
            MttrPolicyKind::Fixed => Arc::new(FixedMttr::new(config.mttr_fixed_minutes)),
            MttrPolicyKind::WallClock => Arc::new(WallClockMttr),
        };

        info!(
            generator = generator.as_ref().map(|g| g.name()).unwrap_or("none"),
            runner = runner.name(),
            mttr_policy = mttr.name(),
            "Remediation collaborators configured"
        );

        let orchestrator = RemediationOrchestrator::new(stores, generator, runner)
            .with_mttr_policy(mttr)
            .with_alert_id_policy(config.alert_id_policy);

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
            start_time: std::time::Instant::now(),
        })
    }

    pub fn orchestrator(&self) -> &Arc<RemediationOrchestrator> {
        &self.orchestrator
    }
}

#[async_trait]
impl TriageService for RemediationService {
    fn service_id(&self) -> &'static str {
        "remediation-engine"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: self.service_id().to_string(),
            version: self.version().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    async fn ready(&self) -> ReadinessStatus {
        ReadinessStatus::from_dependencies(vec![DependencyStatus::new(
            "plan-generator",
            self.orchestrator.plan_generator_configured(),
        )])
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Remediation Engine");
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        info!(
            http = %self.config.http_bind,
            execution_mode = ?self.config.execution_mode,
            plan_generator = self.orchestrator.plan_generator_configured(),
            "Starting Remediation Engine"
        );

        let app = api::router(Arc::new(AppState::new(self.orchestrator.clone())));

        let listener = tokio::net::TcpListener::bind(&self.config.http_bind).await?;
        axum::serve(listener, app)
            .await
            .map_err(|e| TriageError::Server(e.to_string()))?;

        Ok(())
    }
}
