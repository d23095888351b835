//! Remediation Engine
//!
//! Safety-gated remediation pipeline for infrastructure alerts:
//! - Alert ingestion and storage
//! - AI remediation plans via a pluggable plan generator
//! - Pattern-based script safety validation, re-run before every execution
//! - Operator-approved execution through simulated or real runners
//! - Execution results and MTTR reporting

pub mod api;
pub mod config;
pub mod mttr;
pub mod planner;
pub mod remediation;
pub mod runner;
pub mod safety;
pub mod seed;
pub mod service;
pub mod stats;
pub mod store;

pub use config::EngineConfig;
pub use remediation::{ExecutionOutcome, RemediationError, RemediationOrchestrator, Stores};
pub use safety::{Recommendation, SafetyValidator, ValidationVerdict};
pub use service::RemediationService;
