//! MTTR policies
//!
//! Mean-time-to-repair is a business metric owned by the orchestrator, not
//! by runners, so the policy can change without touching any backend.

use chrono::{DateTime, Utc};
use triage_core::Alert;

use crate::runner::RunOutcome;

pub const DEFAULT_FIXED_MINUTES: u32 = 4;

pub trait MttrPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// `alert` is None when an override plan was executed for an alert this
    /// instance has not ingested.
    fn mttr_minutes(&self, alert: Option<&Alert>, outcome: &RunOutcome, completed_at: DateTime<Utc>) -> u32;
}

/// Constant value per remediation, used for demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedMttr {
    minutes: u32,
}

impl FixedMttr {
    pub fn new(minutes: u32) -> Self {
        Self { minutes }
    }
}

impl Default for FixedMttr {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_MINUTES)
    }
}

impl MttrPolicy for FixedMttr {
    fn name(&self) -> &str {
        "fixed"
    }

    fn mttr_minutes(&self, _alert: Option<&Alert>, _outcome: &RunOutcome, _completed_at: DateTime<Utc>) -> u32 {
        self.minutes
    }
}

/// Whole minutes from the alert timestamp to execution completion.
/// Falls back to the run duration when the alert is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClockMttr;

impl MttrPolicy for WallClockMttr {
    fn name(&self) -> &str {
        "wall_clock"
    }

    fn mttr_minutes(&self, alert: Option<&Alert>, outcome: &RunOutcome, completed_at: DateTime<Utc>) -> u32 {
        let minutes = match alert {
            Some(alert) => (completed_at - alert.timestamp).num_minutes(),
            None => (outcome.elapsed.as_secs() / 60) as i64,
        };
        minutes.clamp(0, u32::MAX as i64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunStatus;
    use chrono::Duration as ChronoDuration;
    use std::collections::HashMap;
    use std::time::Duration;
    use triage_core::Severity;

    fn outcome(elapsed: Duration) -> RunOutcome {
        RunOutcome {
            status: RunStatus::Success,
            output: String::new(),
            exit_code: 0,
            elapsed,
        }
    }

    fn alert_at(timestamp: DateTime<Utc>) -> Alert {
        Alert {
            id: "INC0012345".into(),
            timestamp,
            severity: Severity::Critical,
            system: "PROD-DB-01".into(),
            alert_type: "disk_space".into(),
            description: "Disk space critical".into(),
            metrics: HashMap::new(),
        }
    }

    #[test]
    fn test_fixed_policy_ignores_timing() {
        let policy = FixedMttr::default();
        let now = Utc::now();
        assert_eq!(policy.mttr_minutes(None, &outcome(Duration::from_secs(900)), now), 4);
    }

    #[test]
    fn test_wall_clock_from_alert_timestamp() {
        let now = Utc::now();
        let alert = alert_at(now - ChronoDuration::minutes(17) - ChronoDuration::seconds(30));
        let minutes = WallClockMttr.mttr_minutes(Some(&alert), &outcome(Duration::ZERO), now);
        assert_eq!(minutes, 17);
    }

    #[test]
    fn test_wall_clock_never_negative() {
        let now = Utc::now();
        let alert = alert_at(now + ChronoDuration::hours(1));
        assert_eq!(WallClockMttr.mttr_minutes(Some(&alert), &outcome(Duration::ZERO), now), 0);
    }

    #[test]
    fn test_wall_clock_without_alert_uses_elapsed() {
        let now = Utc::now();
        let minutes = WallClockMttr.mttr_minutes(None, &outcome(Duration::from_secs(185)), now);
        assert_eq!(minutes, 3);
    }
}
