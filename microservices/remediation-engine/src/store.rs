//! Storage abstractions for alerts, plans and execution results
//!
//! Every store replaces whole records on write, so readers never observe a
//! partially written value. The in-memory implementations are what the
//! service runs with; a persistent backend only has to implement the traits.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;
use triage_core::{Alert, ExecutionResult, RemediationPlan};

pub trait AlertStore: Send + Sync {
    /// Insert or replace the alert with the same id.
    fn put(&self, alert: Alert);

    /// Insert only if no alert with this id exists. Returns false otherwise.
    fn try_insert(&self, alert: Alert) -> bool;

    fn get(&self, id: &str) -> Option<Alert>;

    /// All alerts in first-ingest order.
    fn list(&self) -> Vec<Alert>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait PlanStore: Send + Sync {
    fn put(&self, alert_id: &str, plan: RemediationPlan);
    fn get(&self, alert_id: &str) -> Option<RemediationPlan>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait ExecutionStore: Send + Sync {
    fn put(&self, alert_id: &str, result: ExecutionResult);
    fn get(&self, alert_id: &str) -> Option<ExecutionResult>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct AlertTable {
    order: Vec<String>,
    by_id: HashMap<String, Alert>,
}

/// Alerts guarded by a single lock so listing keeps ingest order.
#[derive(Default)]
pub struct InMemoryAlertStore {
    table: RwLock<AlertTable>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertStore for InMemoryAlertStore {
    fn put(&self, alert: Alert) {
        let mut table = self.table.write();
        if !table.by_id.contains_key(&alert.id) {
            table.order.push(alert.id.clone());
        }
        debug!(alert_id = %alert.id, "Storing alert");
        table.by_id.insert(alert.id.clone(), alert);
    }

    fn try_insert(&self, alert: Alert) -> bool {
        let mut table = self.table.write();
        if table.by_id.contains_key(&alert.id) {
            return false;
        }
        table.order.push(alert.id.clone());
        table.by_id.insert(alert.id.clone(), alert);
        true
    }

    fn get(&self, id: &str) -> Option<Alert> {
        self.table.read().by_id.get(id).cloned()
    }

    fn list(&self) -> Vec<Alert> {
        let table = self.table.read();
        table
            .order
            .iter()
            .filter_map(|id| table.by_id.get(id).cloned())
            .collect()
    }

    fn len(&self) -> usize {
        self.table.read().by_id.len()
    }
}

#[derive(Default)]
pub struct InMemoryPlanStore {
    plans: DashMap<String, RemediationPlan>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlanStore for InMemoryPlanStore {
    fn put(&self, alert_id: &str, plan: RemediationPlan) {
        debug!(alert_id = %alert_id, "Storing remediation plan");
        self.plans.insert(alert_id.to_string(), plan);
    }

    fn get(&self, alert_id: &str) -> Option<RemediationPlan> {
        self.plans.get(alert_id).map(|p| p.value().clone())
    }

    fn len(&self) -> usize {
        self.plans.len()
    }
}

#[derive(Default)]
pub struct InMemoryExecutionStore {
    results: DashMap<String, ExecutionResult>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutionStore for InMemoryExecutionStore {
    fn put(&self, alert_id: &str, result: ExecutionResult) {
        debug!(alert_id = %alert_id, status = result.status.as_str(), "Storing execution result");
        self.results.insert(alert_id.to_string(), result);
    }

    fn get(&self, alert_id: &str) -> Option<ExecutionResult> {
        self.results.get(alert_id).map(|r| r.value().clone())
    }

    fn len(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use triage_core::{ExecutionStatus, Severity};

    fn alert(id: &str, description: &str) -> Alert {
        Alert {
            id: id.to_string(),
            timestamp: Utc::now(),
            severity: Severity::High,
            system: "PROD-WEB-02".into(),
            alert_type: "cpu".into(),
            description: description.into(),
            metrics: HashMap::new(),
        }
    }

    #[test]
    fn test_alert_put_overwrites_in_place() {
        let store = InMemoryAlertStore::new();
        store.put(alert("A1", "first"));
        store.put(alert("A2", "second"));
        store.put(alert("A1", "replaced"));

        let ids: Vec<_> = store.list().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["A1", "A2"]);
        assert_eq!(store.get("A1").unwrap().description, "replaced");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_alert_try_insert_keeps_existing() {
        let store = InMemoryAlertStore::new();
        assert!(store.try_insert(alert("A1", "first")));
        assert!(!store.try_insert(alert("A1", "second")));
        assert_eq!(store.get("A1").unwrap().description, "first");
    }

    #[test]
    fn test_execution_store_overwrites() {
        let store = InMemoryExecutionStore::new();
        let mut result = ExecutionResult {
            alert_id: "A1".into(),
            status: ExecutionStatus::Failed,
            output: "exit 1".into(),
            execution_time: 0.5,
            mttr_minutes: 4,
            timestamp: Utc::now(),
        };
        store.put("A1", result.clone());
        result.status = ExecutionStatus::Success;
        store.put("A1", result.clone());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("A1"), Some(result));
        assert!(store.get("A2").is_none());
    }

    #[test]
    fn test_concurrent_alert_writes() {
        let store = Arc::new(InMemoryAlertStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.put(alert(&format!("A{}", i % 10), &format!("t{t}")));
                        let _ = store.list();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 10);
        assert_eq!(store.list().len(), 10);
    }
}
