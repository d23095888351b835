//! HTTP surface
//!
//! Thin mapping of the REST routes onto orchestrator operations.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use triage_core::Alert;

use crate::remediation::{
    parse_plan_override, ExecutionOutcome, RemediationError, RemediationOrchestrator,
};
use crate::stats::StatsReporter;

pub struct AppState {
    pub orchestrator: Arc<RemediationOrchestrator>,
    pub stats: StatsReporter,
}

impl AppState {
    pub fn new(orchestrator: Arc<RemediationOrchestrator>) -> Self {
        let stats = StatsReporter::new(orchestrator.stores().clone());
        Self { orchestrator, stats }
    }
}

type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/alerts", get(list_alerts))
        .route("/alerts/ingest", post(ingest))
        .route("/alerts/{id}", get(get_alert))
        .route("/alerts/{id}/analyze", post(analyze))
        .route("/alerts/{id}/plan", get(get_plan))
        .route("/alerts/{id}/execute", post(execute))
        .route("/alerts/{id}/result", get(get_result))
        .route("/alerts/{id}/state", get(get_state))
        .route("/stats", get(stats))
        .with_state(state)
}

impl IntoResponse for RemediationError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({
            "error": self.error_code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, RemediationError>;

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.orchestrator.health())
}

async fn ready(State(state): State<SharedState>) -> impl IntoResponse {
    let ready = state.orchestrator.plan_generator_configured();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "ready": ready })))
}

async fn ingest(
    State(state): State<SharedState>,
    Json(alert): Json<Alert>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.orchestrator.ingest(alert)?))
}

async fn list_alerts(State(state): State<SharedState>) -> impl IntoResponse {
    let alerts = state.orchestrator.list_alerts();
    Json(json!({ "count": alerts.len(), "alerts": alerts }))
}

async fn get_alert(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.orchestrator.get_alert(&id)?))
}

async fn analyze(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let report = state.orchestrator.analyze(&id).await?;
    Ok(Json(json!({
        "status": "completed",
        "alert_id": report.alert_id,
        "plan": report.plan,
        "validation": report.validation,
        "timestamp": report.timestamp,
    })))
}

async fn get_plan(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.orchestrator.get_plan(&id)?))
}

#[derive(Debug, Deserialize)]
struct ExecuteParams {
    approved: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExecuteBody {
    plan: Option<serde_json::Value>,
}

async fn execute(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(params): Query<ExecuteParams>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let approved = parse_approved(params.approved.as_deref())?;
    let plan_override = plan_from_body(&body)?;
    debug!(alert_id = %id, approved, has_override = plan_override.is_some(), "Execute requested");

    let outcome = state.orchestrator.execute(&id, approved, plan_override).await?;
    Ok(Json(outcome_body(&outcome)))
}

/// Absent means approved.
fn parse_approved(raw: Option<&str>) -> ApiResult<bool> {
    let Some(raw) = raw else {
        return Ok(true);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(RemediationError::InvalidRequest(format!(
            "approved must be a boolean, got {other:?}"
        ))),
    }
}

fn plan_from_body(body: &[u8]) -> ApiResult<Option<triage_core::RemediationPlan>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let parsed: ExecuteBody = serde_json::from_slice(body)
        .map_err(|e| RemediationError::InvalidPlan(e.to_string()))?;
    parsed.plan.map(parse_plan_override).transpose()
}

fn outcome_body(outcome: &ExecutionOutcome) -> serde_json::Value {
    match outcome {
        ExecutionOutcome::Completed(result) => json!(result),
        ExecutionOutcome::Rejected { alert_id, issues } => json!({
            "status": "rejected",
            "message": "Script failed safety validation",
            "issues": issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "alert_id": alert_id,
        }),
        ExecutionOutcome::Cancelled { alert_id } => json!({
            "status": "cancelled",
            "message": "Execution cancelled by technician",
            "alert_id": alert_id,
        }),
    }
}

async fn get_result(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.orchestrator.get_result(&id)?))
}

async fn get_state(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let current = state
        .orchestrator
        .state(&id)
        .ok_or_else(|| RemediationError::AlertNotFound(id.clone()))?;
    Ok(Json(json!({ "alert_id": id, "state": current })))
}

async fn stats(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.stats.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use triage_core::{ExecutionResult, ExecutionStatus};

    #[test]
    fn test_error_status_mapping() {
        let response = RemediationError::PlanNotFound("A1".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = RemediationError::ServiceUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = RemediationError::InvalidPlan("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_approved_flag_parsing() {
        assert!(parse_approved(None).unwrap());
        assert!(parse_approved(Some("true")).unwrap());
        assert!(parse_approved(Some("1")).unwrap());
        assert!(!parse_approved(Some("false")).unwrap());
        assert!(!parse_approved(Some("0")).unwrap());
        assert!(!parse_approved(Some("No")).unwrap());
    }

    #[tokio::test]
    async fn test_bad_approved_flag_is_json_400() {
        let err = parse_approved(Some("maybe")).unwrap_err();
        assert!(matches!(err, RemediationError::InvalidRequest(_)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "INVALID_REQUEST");
        assert!(body["message"].as_str().unwrap().contains("maybe"));
    }

    #[test]
    fn test_empty_body_means_no_override() {
        assert!(plan_from_body(b"").unwrap().is_none());
        assert!(plan_from_body(b"  \n").unwrap().is_none());
        assert!(plan_from_body(br#"{}"#).unwrap().is_none());
    }

    #[test]
    fn test_malformed_override_is_invalid_plan() {
        assert!(matches!(
            plan_from_body(br#"{"plan": {"alert_id": "A1"}}"#),
            Err(RemediationError::InvalidPlan(_))
        ));
        assert!(matches!(
            plan_from_body(b"not json"),
            Err(RemediationError::InvalidPlan(_))
        ));
        assert!(matches!(
            plan_from_body(br#"{"script": "rm -rf /"}"#),
            Err(RemediationError::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_well_formed_override_parses() {
        let body = json!({
            "plan": {
                "alert_id": "A1",
                "root_cause": "tmp growth",
                "confidence": 0.5,
                "reasoning": "",
                "steps": [],
                "script": "df -h",
                "script_language": "bash",
                "safety_checks": [],
                "estimated_time": "1 minute",
                "rollback_plan": "none"
            }
        });
        let plan = plan_from_body(body.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(plan.alert_id, "A1");
    }

    #[test]
    fn test_outcome_bodies_carry_status() {
        let cancelled = outcome_body(&ExecutionOutcome::Cancelled { alert_id: "A1".into() });
        assert_eq!(cancelled["status"], "cancelled");

        let rejected = outcome_body(&ExecutionOutcome::Rejected {
            alert_id: "A2".into(),
            issues: vec![],
        });
        assert_eq!(rejected["status"], "rejected");

        let completed = outcome_body(&ExecutionOutcome::Completed(ExecutionResult {
            alert_id: "A3".into(),
            status: ExecutionStatus::Success,
            output: "done".into(),
            execution_time: 0.02,
            mttr_minutes: 4,
            timestamp: Utc::now(),
        }));
        assert_eq!(completed["status"], "success");
        assert_eq!(completed["mttr_minutes"], 4);
    }
}
