use serde::{Deserialize, Serialize};

use crate::constants::{AGENT_UNSPECIFIED, MIN_RO_NUM_LEN};
use crate::types::Record;

/// Quality assessment result from the Quality Gate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityAssessment {
    /// The quality gate decision
    pub decision: QualityDecision,
    /// Specific quality issues found
    pub issues: Vec<QualityIssue>,
}

impl QualityAssessment {
    pub fn is_accepted(&self) -> bool {
        self.decision != QualityDecision::Reject
    }

    /// Description of the first issue that caused a rejection
    pub fn rejection_reason(&self) -> Option<&str> {
        self.issues
            .iter()
            .find(|i| i.severity.is_blocking())
            .map(|i| i.description.as_str())
    }
}

/// Quality Gate decision for a record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QualityDecision {
    /// Record meets quality standards and is admitted
    Accept,
    /// Record is admitted but has gaps worth reporting
    AcceptWithWarnings,
    /// Record violates a record invariant and is discarded
    Reject,
}

/// Individual quality issue found during assessment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityIssue {
    pub issue_type: QualityIssueType,
    pub severity: QualitySeverity,
    /// Human-readable description of the issue
    pub description: String,
    /// Field that triggered this issue
    pub field: Option<String>,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QualityIssueType {
    /// Missing required data
    MissingData,
    /// Data outside expected ranges
    OutOfRange,
    /// Suspicious or anomalous values
    SuspiciousValue,
}

impl QualityIssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityIssueType::MissingData => "missing_data",
            QualityIssueType::OutOfRange => "out_of_range",
            QualityIssueType::SuspiciousValue => "suspicious_value",
        }
    }
}

/// Severity levels for quality issues
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualitySeverity {
    /// Minor issue, record can proceed
    Info,
    /// Notable issue worth flagging
    Warning,
    /// Record invariant violated
    Error,
    /// Record cannot be identified
    Critical,
}

impl QualitySeverity {
    pub fn is_blocking(&self) -> bool {
        *self >= QualitySeverity::Error
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualitySeverity::Info => "info",
            QualitySeverity::Warning => "warning",
            QualitySeverity::Error => "error",
            QualitySeverity::Critical => "critical",
        }
    }
}

/// Trait for implementing Quality Gate assessment logic
pub trait QualityGate {
    /// Assess a freshly built record
    fn assess(&self, record: &Record) -> QualityAssessment;
}

/// Default Quality Gate implementation with configurable rules
#[derive(Debug, Clone, Default)]
pub struct DefaultQualityGate {
    pub config: QualityGateConfig,
}

/// Configuration for Quality Gate assessment rules
#[derive(Debug, Clone)]
pub struct QualityGateConfig {
    /// Minimum RO number length
    pub min_ro_num_len: usize,
    pub warn_missing_date: bool,
    pub warn_zero_offer_value: bool,
    pub warn_unspecified_agent: bool,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            min_ro_num_len: MIN_RO_NUM_LEN,
            warn_missing_date: true,
            warn_zero_offer_value: true,
            warn_unspecified_agent: true,
        }
    }
}

impl DefaultQualityGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: QualityGateConfig) -> Self {
        Self { config }
    }

    /// Checks that reject the record outright
    fn assess_invariants(&self, record: &Record) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        if record.ro_num.chars().count() < self.config.min_ro_num_len {
            issues.push(QualityIssue {
                issue_type: QualityIssueType::MissingData,
                severity: QualitySeverity::Critical,
                description: format!("RO number '{}' is too short", record.ro_num),
                field: Some("ro_num".to_string()),
                suggestion: Some(format!(
                    "RO number must have at least {} characters",
                    self.config.min_ro_num_len
                )),
            });
        }

        for (field, value) in [
            ("offer_value", record.offer_value),
            ("contract_value", record.contract_value),
        ] {
            if !value.is_finite() || value < 0.0 {
                issues.push(QualityIssue {
                    issue_type: QualityIssueType::OutOfRange,
                    severity: QualitySeverity::Error,
                    description: format!("{} {} is negative or not a number", field, value),
                    field: Some(field.to_string()),
                    suggestion: Some("Monetary values must be zero or positive".to_string()),
                });
            }
        }

        let pct = record.completion_percent;
        if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
            issues.push(QualityIssue {
                issue_type: QualityIssueType::OutOfRange,
                severity: QualitySeverity::Error,
                description: format!("completion percentage {} is outside 0..100", pct),
                field: Some("completion_percent".to_string()),
                suggestion: Some("Use a fraction (0.6) or a percentage (60)".to_string()),
            });
        }

        issues
    }

    /// Gaps that are reported but do not block admission
    fn assess_completeness(&self, record: &Record) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        if self.config.warn_missing_date && record.ro_date.is_none() {
            issues.push(QualityIssue {
                issue_type: QualityIssueType::MissingData,
                severity: QualitySeverity::Warning,
                description: "RO date is missing".to_string(),
                field: Some("ro_date".to_string()),
                suggestion: Some("Records without a date are left out of monthly trends".to_string()),
            });
        }

        if self.config.warn_zero_offer_value && record.offer_value == 0.0 {
            issues.push(QualityIssue {
                issue_type: QualityIssueType::SuspiciousValue,
                severity: QualitySeverity::Warning,
                description: "Offer value is zero".to_string(),
                field: Some("offer_value".to_string()),
                suggestion: None,
            });
        }

        if self.config.warn_unspecified_agent && record.agent_name == AGENT_UNSPECIFIED {
            issues.push(QualityIssue {
                issue_type: QualityIssueType::MissingData,
                severity: QualitySeverity::Info,
                description: "No agent assigned".to_string(),
                field: Some("agent_name".to_string()),
                suggestion: None,
            });
        }

        issues
    }

    fn determine_decision(&self, issues: &[QualityIssue]) -> QualityDecision {
        if issues.iter().any(|i| i.severity.is_blocking()) {
            return QualityDecision::Reject;
        }

        if issues.iter().any(|i| i.severity >= QualitySeverity::Warning) {
            return QualityDecision::AcceptWithWarnings;
        }

        QualityDecision::Accept
    }
}

impl QualityGate for DefaultQualityGate {
    fn assess(&self, record: &Record) -> QualityAssessment {
        let mut issues = self.assess_invariants(record);
        issues.extend(self.assess_completeness(record));

        let decision = self.determine_decision(&issues);
        QualityAssessment { decision, issues }
    }
}
