//! Pipeline statistics, recomputed from the stores on every call

use serde::{Deserialize, Serialize};

use crate::remediation::Stores;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub total_alerts: usize,
    pub analyzed: usize,
    pub executed: usize,
    pub success_rate: f64,
}

pub struct StatsReporter {
    stores: Stores,
}

impl StatsReporter {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub fn stats(&self) -> PipelineStats {
        let total_alerts = self.stores.alerts.len();
        let analyzed = self.stores.plans.len();
        let executed = self.stores.executions.len();

        PipelineStats {
            total_alerts,
            analyzed,
            executed,
            success_rate: success_rate(executed, analyzed),
        }
    }
}

/// Executions written by override-only requests can outnumber stored plans,
/// hence the clamp.
fn success_rate(executed: usize, analyzed: usize) -> f64 {
    if analyzed == 0 {
        return 0.0;
    }
    (executed as f64 / analyzed as f64 * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use triage_core::{ExecutionResult, ExecutionStatus, RemediationPlan, ScriptLanguage};

    fn plan(alert_id: &str) -> RemediationPlan {
        RemediationPlan {
            alert_id: alert_id.into(),
            root_cause: "memory leak".into(),
            confidence: 0.6,
            reasoning: "working set grows linearly".into(),
            steps: vec!["Recycle app pool".into()],
            script: "Restart-WebAppPool -Name api".into(),
            script_language: ScriptLanguage::Powershell,
            safety_checks: vec![],
            estimated_time: "2 minutes".into(),
            rollback_plan: "none".into(),
        }
    }

    fn result(alert_id: &str) -> ExecutionResult {
        ExecutionResult {
            alert_id: alert_id.into(),
            status: ExecutionStatus::Success,
            output: "ok".into(),
            execution_time: 0.1,
            mttr_minutes: 4,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_empty_stores() {
        let stats = StatsReporter::new(Stores::in_memory()).stats();
        assert_eq!(stats.total_alerts, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_success_rate_from_counts() {
        let stores = Stores::in_memory();
        for id in ["A1", "A2", "A3", "A4"] {
            stores.plans.put(id, plan(id));
        }
        stores.executions.put("A1", result("A1"));

        let stats = StatsReporter::new(stores).stats();
        assert_eq!(stats.analyzed, 4);
        assert_eq!(stats.executed, 1);
        assert_eq!(stats.success_rate, 25.0);
    }

    #[test]
    fn test_success_rate_bounds() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(5, 0), 0.0);
        assert_eq!(success_rate(3, 3), 100.0);
        assert_eq!(success_rate(4, 2), 100.0);
        for executed in 0..10 {
            for analyzed in 1..10 {
                let rate = success_rate(executed, analyzed);
                assert!((0.0..=100.0).contains(&rate));
            }
        }
    }
}
