//! Core domain types shared by the triage services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, TriageError};

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Incoming alert from a monitoring system. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub system: String,
    pub alert_type: String,
    pub description: String,
    #[serde(default)]
    pub metrics: HashMap<String, serde_json::Value>,
}

/// Interpreter a remediation script targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLanguage {
    #[default]
    Powershell,
    Bash,
}

impl ScriptLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Powershell => "powershell",
            Self::Bash => "bash",
        }
    }

    /// File extension used when the script is materialized on disk
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Powershell => "ps1",
            Self::Bash => "sh",
        }
    }
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plan content as produced by a plan generator, before it is bound to an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDraft {
    pub root_cause: String,
    pub confidence: f64,
    pub reasoning: String,
    pub steps: Vec<String>,
    pub script: String,
    #[serde(default)]
    pub script_language: ScriptLanguage,
    #[serde(default)]
    pub safety_checks: Vec<String>,
    pub estimated_time: String,
    pub rollback_plan: String,
}

impl PlanDraft {
    pub fn bind(self, alert_id: impl Into<String>) -> RemediationPlan {
        RemediationPlan {
            alert_id: alert_id.into(),
            root_cause: self.root_cause,
            confidence: self.confidence,
            reasoning: self.reasoning,
            steps: self.steps,
            script: self.script,
            script_language: self.script_language,
            safety_checks: self.safety_checks,
            estimated_time: self.estimated_time,
            rollback_plan: self.rollback_plan,
        }
    }
}

/// AI-generated remediation plan, one per alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemediationPlan {
    pub alert_id: String,
    pub root_cause: String,
    pub confidence: f64,
    pub reasoning: String,
    pub steps: Vec<String>,
    pub script: String,
    #[serde(default)]
    pub script_language: ScriptLanguage,
    pub safety_checks: Vec<String>,
    pub estimated_time: String,
    pub rollback_plan: String,
}

impl RemediationPlan {
    /// Structural checks serde cannot express.
    pub fn check(&self) -> Result<()> {
        if self.alert_id.trim().is_empty() {
            return Err(TriageError::Validation("alert_id must not be empty".into()));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(TriageError::Validation(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Execution outcome status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Cancelled,
    Rejected,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }
}

/// Recorded result of running a remediation script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub alert_id: String,
    pub status: ExecutionStatus,
    pub output: String,
    /// Seconds, rounded to two decimals
    pub execution_time: f64,
    pub mttr_minutes: u32,
    pub timestamp: DateTime<Utc>,
}

/// Position of an alert in the remediation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationState {
    Ingested,
    Analyzed,
    ValidatedSafe,
    ValidatedUnsafe,
    Executed,
    Rejected,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(confidence: f64) -> RemediationPlan {
        RemediationPlan {
            alert_id: "INC0012345".into(),
            root_cause: "IIS logs not rotated".into(),
            confidence,
            reasoning: "log directory grew 12GB in a week".into(),
            steps: vec!["Back up logs".into(), "Delete logs older than 30 days".into()],
            script: "Write-Output 'ok'".into(),
            script_language: ScriptLanguage::Powershell,
            safety_checks: vec![],
            estimated_time: "5 minutes".into(),
            rollback_plan: "Restore from D:\\Backups".into(),
        }
    }

    #[test]
    fn test_alert_deserializes_without_metrics() {
        let alert: Alert = serde_json::from_str(
            r#"{
                "id": "INC0012345",
                "timestamp": "2025-10-11T02:17:00Z",
                "severity": "critical",
                "system": "PROD-DB-01",
                "alert_type": "disk_space",
                "description": "Disk space critical on C:\\ drive - 95% full"
            }"#,
        )
        .unwrap();

        assert_eq!(alert.severity, Severity::Critical);
        assert!(alert.metrics.is_empty());
    }

    #[test]
    fn test_plan_check_confidence_bounds() {
        assert!(plan(0.0).check().is_ok());
        assert!(plan(1.0).check().is_ok());
        assert!(plan(1.2).check().is_err());
        assert!(plan(-0.1).check().is_err());
        assert!(plan(f64::NAN).check().is_err());
    }

    #[test]
    fn test_plan_rejects_unknown_fields() {
        let mut value = serde_json::to_value(plan(0.9)).unwrap();
        value["run_as"] = serde_json::json!("SYSTEM");
        assert!(serde_json::from_value::<RemediationPlan>(value).is_err());
    }

    #[test]
    fn test_draft_binds_to_alert() {
        let draft = PlanDraft {
            root_cause: "tmp growth".into(),
            confidence: 0.7,
            reasoning: "".into(),
            steps: vec![],
            script: "df -h".into(),
            script_language: ScriptLanguage::Bash,
            safety_checks: vec![],
            estimated_time: "1 minute".into(),
            rollback_plan: "none".into(),
        };
        let plan = draft.bind("A1");
        assert_eq!(plan.alert_id, "A1");
        assert_eq!(plan.script_language, ScriptLanguage::Bash);
    }
}
