//! Plan Generation
//!
//! The orchestrator treats plan generation as an opaque capability. The
//! bundled implementation asks Gemini for a JSON remediation plan.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use triage_core::{Alert, PlanDraft};

use crate::config::GeminiConfig;

#[derive(Debug, Error)]
pub enum PlanGeneratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider returned no plan")]
    Empty,

    #[error("Unauthorized")]
    Unauthorized,
}

pub type Result<T> = std::result::Result<T, PlanGeneratorError>;

#[async_trait]
pub trait PlanGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, alert: &Alert) -> Result<PlanDraft>;
}

/// Gemini `generateContent` client
pub struct GeminiPlanGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
}

impl GeminiPlanGenerator {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl PlanGenerator for GeminiPlanGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, alert: &Alert) -> Result<PlanDraft> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(alert),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json".to_string(),
            },
        };

        debug!(alert_id = %alert.id, model = %self.model, "Requesting remediation plan");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(PlanGeneratorError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlanGeneratorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .map(|p| p.text)
            .find(|t| !t.trim().is_empty())
            .ok_or(PlanGeneratorError::Empty)?;

        let draft = parse_plan(&text)?;
        info!(
            alert_id = %alert.id,
            confidence = draft.confidence,
            language = %draft.script_language,
            "Remediation plan generated"
        );
        Ok(draft)
    }
}

pub(crate) fn build_prompt(alert: &Alert) -> String {
    let metrics = serde_json::to_string_pretty(&alert.metrics).unwrap_or_else(|_| "{}".to_string());
    format!(
        "You are a senior site reliability engineer triaging an infrastructure alert.\n\
         Alert ID: {id}\n\
         Timestamp: {timestamp}\n\
         Severity: {severity}\n\
         System: {system}\n\
         Type: {alert_type}\n\
         Description: {description}\n\
         Metrics: {metrics}\n\n\
         Produce a remediation plan as JSON only, matching this schema:\n\
         {{\"root_cause\": string, \"confidence\": number between 0 and 1, \"reasoning\": string, \
         \"steps\": [string], \"script\": string, \"script_language\": \"powershell\" | \"bash\", \
         \"safety_checks\": [string], \"estimated_time\": string, \"rollback_plan\": string}}\n\n\
         Script requirements: verify paths exist before modifying them, wrap changes in error \
         handling, back up anything you delete, and never touch operating system directories.",
        id = alert.id,
        timestamp = alert.timestamp.to_rfc3339(),
        severity = alert.severity,
        system = alert.system,
        alert_type = alert.alert_type,
        description = alert.description,
        metrics = metrics,
    )
}

/// Extract a plan from model text, tolerating markdown code fences.
pub(crate) fn parse_plan(raw: &str) -> Result<PlanDraft> {
    let start = raw
        .find('{')
        .ok_or_else(|| PlanGeneratorError::Parse("no JSON object in response".into()))?;
    let end = raw
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| PlanGeneratorError::Parse("unterminated JSON object in response".into()))?;

    serde_json::from_str(&raw[start..=end])
        .map_err(|e| PlanGeneratorError::Parse(format!("invalid plan json: {e}")))
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
