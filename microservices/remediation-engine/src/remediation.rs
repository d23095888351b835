//! Remediation Orchestrator
//!
//! Drives each alert through the pipeline:
//! ingest -> analyze -> validate -> approve -> execute -> record.
//! Execution always re-validates the script it is about to run, whatever
//! happened at analysis time.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use triage_core::{
    Alert, ExecutionResult, ExecutionStatus, RemediationPlan, RemediationState,
};

use crate::config::AlertIdPolicy;
use crate::mttr::{FixedMttr, MttrPolicy};
use crate::planner::PlanGenerator;
use crate::runner::{RunStatus, Runner, RunnerError};
use crate::safety::{SafetyValidator, ValidationIssue, ValidationVerdict};
use crate::store::{
    AlertStore, ExecutionStore, InMemoryAlertStore, InMemoryExecutionStore, InMemoryPlanStore,
    PlanStore,
};

pub const SERVICE_NAME: &str = "Alert Triage AI";

#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    #[error("Remediation plan not found: {0}")]
    PlanNotFound(String),

    #[error("Execution result not found: {0}")]
    ResultNotFound(String),

    #[error("Alert already exists: {0}")]
    DuplicateAlert(String),

    #[error("Plan generator not configured. Set GEMINI_API_KEY to enable analysis")]
    ServiceUnavailable,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid remediation plan: {0}")]
    InvalidPlan(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(#[from] RunnerError),
}

impl RemediationError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AlertNotFound(_) | Self::PlanNotFound(_) | Self::ResultNotFound(_) => 404,
            Self::InvalidRequest(_) => 400,
            Self::DuplicateAlert(_) => 409,
            Self::InvalidPlan(_) => 422,
            Self::ServiceUnavailable => 503,
            Self::AnalysisFailed(_) | Self::ExecutionFailed(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlertNotFound(_) => "ALERT_NOT_FOUND",
            Self::PlanNotFound(_) => "PLAN_NOT_FOUND",
            Self::ResultNotFound(_) => "RESULT_NOT_FOUND",
            Self::DuplicateAlert(_) => "DUPLICATE_ALERT",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidPlan(_) => "INVALID_PLAN",
            Self::AnalysisFailed(_) => "ANALYSIS_FAILED",
            Self::ExecutionFailed(_) => "EXECUTION_FAILED",
        }
    }
}

pub type Result<T> = std::result::Result<T, RemediationError>;

/// The three stores the pipeline reads and writes
#[derive(Clone)]
pub struct Stores {
    pub alerts: Arc<dyn AlertStore>,
    pub plans: Arc<dyn PlanStore>,
    pub executions: Arc<dyn ExecutionStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            alerts: Arc::new(InMemoryAlertStore::new()),
            plans: Arc::new(InMemoryPlanStore::new()),
            executions: Arc::new(InMemoryExecutionStore::new()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub message: String,
    pub alert_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub alert_id: String,
    pub plan: RemediationPlan,
    pub validation: ValidationVerdict,
    pub timestamp: DateTime<Utc>,
}

/// Terminal result of an execute request. Rejection and cancellation are
/// expected outcomes, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed(ExecutionResult),
    Rejected {
        alert_id: String,
        issues: Vec<ValidationIssue>,
    },
    Cancelled {
        alert_id: String,
    },
}

impl ExecutionOutcome {
    pub fn status(&self) -> ExecutionStatus {
        match self {
            Self::Completed(result) => result.status,
            Self::Rejected { .. } => ExecutionStatus::Rejected,
            Self::Cancelled { .. } => ExecutionStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub version: String,
    pub plan_generator_configured: bool,
}

/// Parse a caller-supplied plan payload against the strict plan schema.
pub fn parse_plan_override(payload: serde_json::Value) -> Result<RemediationPlan> {
    serde_json::from_value(payload).map_err(|e| RemediationError::InvalidPlan(e.to_string()))
}

pub struct RemediationOrchestrator {
    stores: Stores,
    generator: Option<Arc<dyn PlanGenerator>>,
    validator: SafetyValidator,
    runner: Arc<dyn Runner>,
    mttr: Arc<dyn MttrPolicy>,
    alert_id_policy: AlertIdPolicy,
    states: DashMap<String, RemediationState>,
}

impl RemediationOrchestrator {
    pub fn new(
        stores: Stores,
        generator: Option<Arc<dyn PlanGenerator>>,
        runner: Arc<dyn Runner>,
    ) -> Self {
        Self {
            stores,
            generator,
            validator: SafetyValidator::new(),
            runner,
            mttr: Arc::new(FixedMttr::default()),
            alert_id_policy: AlertIdPolicy::default(),
            states: DashMap::new(),
        }
    }

    pub fn with_mttr_policy(mut self, policy: Arc<dyn MttrPolicy>) -> Self {
        self.mttr = policy;
        self
    }

    pub fn with_alert_id_policy(mut self, policy: AlertIdPolicy) -> Self {
        self.alert_id_policy = policy;
        self
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Fixed at construction; not re-probed per request.
    pub fn plan_generator_configured(&self) -> bool {
        self.generator.is_some()
    }

    pub fn mttr_policy_name(&self) -> &str {
        self.mttr.name()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            plan_generator_configured: self.plan_generator_configured(),
        }
    }

    pub fn ingest(&self, alert: Alert) -> Result<IngestReceipt> {
        let alert_id = alert.id.clone();

        match self.alert_id_policy {
            AlertIdPolicy::Overwrite => self.stores.alerts.put(alert),
            AlertIdPolicy::RequireUnique => {
                if !self.stores.alerts.try_insert(alert) {
                    warn!(alert_id = %alert_id, "Rejecting duplicate alert");
                    return Err(RemediationError::DuplicateAlert(alert_id));
                }
            }
        }

        self.states.insert(alert_id.clone(), RemediationState::Ingested);
        info!(alert_id = %alert_id, "Alert ingested");

        Ok(IngestReceipt {
            message: "Alert received successfully".to_string(),
            alert_id,
            timestamp: Utc::now(),
        })
    }

    pub fn list_alerts(&self) -> Vec<Alert> {
        self.stores.alerts.list()
    }

    pub fn get_alert(&self, alert_id: &str) -> Result<Alert> {
        self.stores
            .alerts
            .get(alert_id)
            .ok_or_else(|| RemediationError::AlertNotFound(alert_id.to_string()))
    }

    pub fn get_plan(&self, alert_id: &str) -> Result<RemediationPlan> {
        self.stores
            .plans
            .get(alert_id)
            .ok_or_else(|| RemediationError::PlanNotFound(alert_id.to_string()))
    }

    pub fn get_result(&self, alert_id: &str) -> Result<ExecutionResult> {
        self.stores
            .executions
            .get(alert_id)
            .ok_or_else(|| RemediationError::ResultNotFound(alert_id.to_string()))
    }

    pub fn state(&self, alert_id: &str) -> Option<RemediationState> {
        self.states.get(alert_id).map(|s| *s.value())
    }

    /// Generate, persist and pre-validate a plan. The generator is called
    /// once; retries are the caller's business.
    pub async fn analyze(&self, alert_id: &str) -> Result<AnalysisReport> {
        let alert = self.get_alert(alert_id)?;
        let generator = self
            .generator
            .as_ref()
            .ok_or(RemediationError::ServiceUnavailable)?;

        info!(alert_id = %alert_id, generator = generator.name(), "Analyzing alert");

        let draft = generator.generate(&alert).await.map_err(|e| {
            error!(alert_id = %alert_id, error = %e, "Plan generation failed");
            RemediationError::AnalysisFailed(e.to_string())
        })?;

        let plan = draft.bind(alert_id);
        plan.check().map_err(|e| {
            error!(alert_id = %alert_id, error = %e, "Generated plan is malformed");
            RemediationError::AnalysisFailed(e.to_string())
        })?;

        let validation = self.validator.validate(&plan.script, plan.script_language);
        self.stores.plans.put(alert_id, plan.clone());
        self.transition(alert_id, RemediationState::Analyzed);
        self.transition(
            alert_id,
            if validation.is_approved() {
                RemediationState::ValidatedSafe
            } else {
                RemediationState::ValidatedUnsafe
            },
        );

        info!(
            alert_id = %alert_id,
            recommendation = ?validation.recommendation,
            safety_score = validation.safety_score,
            issues = validation.issues.len(),
            "Remediation plan ready"
        );

        Ok(AnalysisReport {
            alert_id: alert_id.to_string(),
            plan,
            validation,
            timestamp: Utc::now(),
        })
    }

    /// Execute the remediation for an alert.
    ///
    /// `plan_override` takes precedence over the stored plan so that a plan
    /// displayed by one instance can be executed by another.
    pub async fn execute(
        &self,
        alert_id: &str,
        approved: bool,
        plan_override: Option<RemediationPlan>,
    ) -> Result<ExecutionOutcome> {
        if !approved {
            info!(alert_id = %alert_id, "Execution cancelled by technician");
            self.transition(alert_id, RemediationState::Cancelled);
            return Ok(ExecutionOutcome::Cancelled {
                alert_id: alert_id.to_string(),
            });
        }

        let plan = match plan_override {
            Some(plan) => {
                check_override(alert_id, &plan)?;
                plan
            }
            None => self.get_plan(alert_id)?,
        };

        let verdict = self.validator.validate(&plan.script, plan.script_language);
        if !verdict.is_approved() {
            warn!(
                alert_id = %alert_id,
                critical = verdict.critical_issues().count(),
                "Script failed safety validation"
            );
            self.transition(alert_id, RemediationState::Rejected);
            return Ok(ExecutionOutcome::Rejected {
                alert_id: alert_id.to_string(),
                issues: verdict.issues,
            });
        }

        info!(
            alert_id = %alert_id,
            runner = self.runner.name(),
            language = %plan.script_language,
            "Starting remediation"
        );

        let outcome = self
            .runner
            .run(&plan.script, plan.script_language)
            .await
            .map_err(|e| {
                error!(alert_id = %alert_id, error = %e, "Runner failed");
                RemediationError::ExecutionFailed(e)
            })?;

        let completed_at = Utc::now();
        let alert = self.stores.alerts.get(alert_id);
        let mttr_minutes = self.mttr.mttr_minutes(alert.as_ref(), &outcome, completed_at);

        let result = ExecutionResult {
            alert_id: alert_id.to_string(),
            status: match outcome.status {
                RunStatus::Success => ExecutionStatus::Success,
                RunStatus::Failed => ExecutionStatus::Failed,
            },
            output: outcome.output,
            execution_time: (outcome.elapsed.as_secs_f64() * 100.0).round() / 100.0,
            mttr_minutes,
            timestamp: completed_at,
        };

        self.stores.executions.put(alert_id, result.clone());
        self.transition(alert_id, RemediationState::Executed);

        if result.status == ExecutionStatus::Success {
            info!(
                alert_id = %alert_id,
                execution_time = result.execution_time,
                mttr_minutes,
                mttr_policy = self.mttr.name(),
                "Remediation successful"
            );
        } else {
            warn!(alert_id = %alert_id, execution_time = result.execution_time, "Remediation script failed");
        }

        Ok(ExecutionOutcome::Completed(result))
    }

    /// Only alerts this instance ingested are tracked.
    fn transition(&self, alert_id: &str, next: RemediationState) {
        if let Some(mut state) = self.states.get_mut(alert_id) {
            *state = next;
        }
    }
}

fn check_override(alert_id: &str, plan: &RemediationPlan) -> Result<()> {
    plan.check()
        .map_err(|e| RemediationError::InvalidPlan(e.to_string()))?;
    if plan.alert_id != alert_id {
        return Err(RemediationError::InvalidPlan(format!(
            "plan belongs to alert {}, not {}",
            plan.alert_id, alert_id
        )));
    }
    Ok(())
}
