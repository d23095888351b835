//! Bootstrap alerts loaded at startup

use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};
use triage_core::Alert;

use crate::remediation::RemediationOrchestrator;

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedDocument {
    One(Alert),
    Many(Vec<Alert>),
}

/// Load seed alerts from a JSON file holding one alert or an array of them.
/// Failures are logged and otherwise ignored; returns how many were ingested.
pub async fn load_seed_alerts(orchestrator: &RemediationOrchestrator, path: impl AsRef<Path>) -> usize {
    let path = path.as_ref();

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read seed alerts");
            return 0;
        }
    };

    let alerts = match serde_json::from_str::<SeedDocument>(&content) {
        Ok(SeedDocument::One(alert)) => vec![alert],
        Ok(SeedDocument::Many(alerts)) => alerts,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not parse seed alerts");
            return 0;
        }
    };

    let mut loaded = 0;
    for alert in alerts {
        let alert_id = alert.id.clone();
        match orchestrator.ingest(alert) {
            Ok(_) => {
                info!(alert_id = %alert_id, "Loaded seed alert");
                loaded += 1;
            }
            Err(e) => warn!(alert_id = %alert_id, error = %e, "Skipping seed alert"),
        }
    }
    loaded
}
