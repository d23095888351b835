//! Script Safety Validator
//!
//! Screens generated remediation scripts for catastrophic operations
//! before any execution path is reached. Pattern based, not a sandbox.

use regex::Regex;
use serde::{Deserialize, Serialize};
use triage_core::ScriptLanguage;

/// Dangerous command patterns, checked in order. Every match is a CRITICAL issue.
const DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    (
        "recursive delete of root or system path",
        r#"(?im)\brm\s+(?:-{1,2}[a-z-]+\s+)*(?:-[a-z]*r[a-z]*|--recursive)\s+(?:-{1,2}[a-z-]+\s+)*['"]?/(?:[\s;&|)'"`*]|$|(?:bin|boot|dev|etc|home|lib|lib64|opt|proc|root|sbin|sys|usr|var)\b)"#,
    ),
    (
        "forced recursive delete of a drive",
        r"(?i)\bdel\s+/f\s+/s\s+/q\s+[a-z]:\\",
    ),
    ("database drop", r"(?i)\bdrop\s+database\b"),
    (
        "forced shutdown",
        r"(?i)\bshutdown\s+(?:/[sp]\b|-[hp]\b|now\b)|\bpoweroff\b|\bstop-computer\b.*-force",
    ),
    (
        "disk format",
        r"(?i)\bformat\s+[a-z]:|\bformat-volume\b|\bmkfs(?:\.[a-z0-9]+)?\s",
    ),
    (
        "privileged registry deletion",
        r"(?i)\breg\s+delete\s+.*hklm|\bremove-item\b.*hklm:",
    ),
    (
        "world-writable permissions on root",
        r#"(?im)\bchmod\s+(?:-{1,2}[a-z-]+\s+)*0?777\s+['"]?/(?:[\s;&|)'"`*]|$)"#,
    ),
    (
        "raw device write",
        r"(?i)>\s*/dev/(?:sd[a-z]|hd[a-z]|vd[a-z]|xvd[a-z]|nvme\d|mmcblk\d)|\bdd\b.*\bof=/dev/(?:sd|hd|vd|xvd|nvme|mmcblk)",
    ),
    ("fork bomb", r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:"),
    (
        "recursive delete of OS directory",
        r"(?i)\bremove-item\b.*-recurse.*c:\\windows|\bremove-item\b.*c:\\windows.*-recurse",
    ),
];

/// Safety idioms that raise the safety score when present.
const SAFETY_IDIOMS: &[(&str, &str)] = &[
    ("existence check", r"(?i)\btest-path\b|\[\[?\s+-[edf]\s"),
    (
        "structured error handling",
        r"(?is)\btry\b.*\bcatch\b|\bset\s+-[a-z]*e|\btrap\b",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueSeverity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

impl ValidationIssue {
    fn critical(message: String) -> Self {
        Self {
            severity: IssueSeverity::Critical,
            message,
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            message: message.into(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == IssueSeverity::Critical
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.severity {
            IssueSeverity::Critical => write!(f, "CRITICAL: {}", self.message),
            IssueSeverity::Warning => write!(f, "WARNING: {}", self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub issues: Vec<ValidationIssue>,
    pub safety_score: u32,
    pub recommendation: Recommendation,
    pub is_safe: bool,
}

impl ValidationVerdict {
    pub fn is_approved(&self) -> bool {
        self.recommendation == Recommendation::Approved
    }

    pub fn critical_issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_critical())
    }
}

struct Rule {
    name: &'static str,
    pattern: Regex,
}

fn compile(rules: &[(&'static str, &'static str)]) -> Vec<Rule> {
    rules
        .iter()
        .map(|(name, pattern)| Rule {
            name,
            pattern: Regex::new(pattern).unwrap(),
        })
        .collect()
}

pub struct SafetyValidator {
    dangerous: Vec<Rule>,
    idioms: Vec<Rule>,
}

impl SafetyValidator {
    pub fn new() -> Self {
        Self {
            dangerous: compile(DANGEROUS_PATTERNS),
            idioms: compile(SAFETY_IDIOMS),
        }
    }

    /// Validate a script. Pure and deterministic; the language does not
    /// change which patterns apply since generated scripts mix idioms.
    pub fn validate(&self, script: &str, _language: ScriptLanguage) -> ValidationVerdict {
        let mut issues = Vec::new();

        for rule in &self.dangerous {
            if rule.pattern.is_match(script) {
                issues.push(ValidationIssue::critical(format!(
                    "Dangerous command pattern detected: {} ({})",
                    rule.name,
                    rule.pattern.as_str()
                )));
            }
        }

        let safety_score = self
            .idioms
            .iter()
            .filter(|rule| rule.pattern.is_match(script))
            .count() as u32;

        if !script.to_lowercase().contains("backup") {
            issues.push(ValidationIssue::warning("No backup step detected"));
        }

        let has_critical = issues.iter().any(ValidationIssue::is_critical);

        ValidationVerdict {
            safety_score,
            recommendation: if has_critical {
                Recommendation::Rejected
            } else {
                Recommendation::Approved
            },
            is_safe: !has_critical,
            issues,
        }
    }
}

impl Default for SafetyValidator {
    fn default() -> Self {
        Self::new()
    }
}
