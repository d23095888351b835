//! Triage Core
//!
//! Domain types for the alert remediation pipeline, the shared error type
//! and the lifecycle every triage service runs under.

pub mod domain;
pub mod error;
pub mod service;

pub use domain::*;
pub use error::{Result, TriageError};
pub use service::{
    shutdown_signal, DependencyStatus, HealthStatus, ReadinessStatus, ServiceRuntime, StopReason,
    TriageService,
};
