//! Quality review results and the approval state machine

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Score at or above which a page may be approved outright
pub const APPROVAL_THRESHOLD: f64 = 0.8;

/// Score below which a page is always rejected
pub const ACCEPTANCE_THRESHOLD: f64 = 0.7;

/// Quality control verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Not reviewed yet
    #[default]
    Pending,
    Approved,
    ApprovedWithWarnings,
    Rejected,
}

impl ApprovalStatus {
    /// Verdict for an overall score and the number of hard defects found.
    ///
    /// Errors cap an otherwise approvable page at `ApprovedWithWarnings`,
    /// and reject it outright anywhere below the approval band.
    pub fn decide(overall_score: f64, error_count: usize) -> Self {
        if overall_score >= APPROVAL_THRESHOLD {
            if error_count == 0 {
                ApprovalStatus::Approved
            } else {
                ApprovalStatus::ApprovedWithWarnings
            }
        } else if overall_score >= ACCEPTANCE_THRESHOLD && error_count == 0 {
            ApprovalStatus::ApprovedWithWarnings
        } else {
            ApprovalStatus::Rejected
        }
    }

    pub fn is_publishable(&self) -> bool {
        matches!(
            self,
            ApprovalStatus::Approved | ApprovalStatus::ApprovedWithWarnings
        )
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::ApprovedWithWarnings => "APPROVED_WITH_WARNINGS",
            ApprovalStatus::Rejected => "REJECTED",
        };
        f.write_str(label)
    }
}

/// Result of one rubric check. Scores start at 1.0 and only go down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub score: f64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Default for CheckResult {
    fn default() -> Self {
        Self {
            score: 1.0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl CheckResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hard defect
    pub fn error(&mut self, message: impl Into<String>, penalty: f64) {
        self.errors.push(message.into());
        self.penalize(penalty);
    }

    /// Record a soft defect
    pub fn warn(&mut self, message: impl Into<String>, penalty: f64) {
        self.warnings.push(message.into());
        self.penalize(penalty);
    }

    fn penalize(&mut self, penalty: f64) {
        self.score = (self.score - penalty.max(0.0)).max(0.0);
    }
}

/// Full quality control report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub overall_score: f64,
    pub approval_status: ApprovalStatus,
    pub checks: BTreeMap<String, CheckResult>,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl QualityReport {
    /// Aggregate check results: mean score, pooled issues and the verdict
    pub fn from_checks(checks: BTreeMap<String, CheckResult>) -> Self {
        let overall_score = if checks.is_empty() {
            0.0
        } else {
            checks.values().map(|c| c.score).sum::<f64>() / checks.len() as f64
        };

        let issues: Vec<String> = checks.values().flat_map(|c| c.errors.clone()).collect();
        let warnings: Vec<String> = checks.values().flat_map(|c| c.warnings.clone()).collect();

        Self {
            overall_score,
            approval_status: ApprovalStatus::decide(overall_score, issues.len()),
            checks,
            issues,
            warnings,
            recommendations: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.overall_score >= ACCEPTANCE_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_thresholds() {
        assert_eq!(ApprovalStatus::decide(0.85, 0), ApprovalStatus::Approved);
        assert_eq!(
            ApprovalStatus::decide(0.75, 0),
            ApprovalStatus::ApprovedWithWarnings
        );
        assert_eq!(ApprovalStatus::decide(0.75, 1), ApprovalStatus::Rejected);
        assert_eq!(ApprovalStatus::decide(0.5, 0), ApprovalStatus::Rejected);
        assert_eq!(
            ApprovalStatus::decide(0.9, 2),
            ApprovalStatus::ApprovedWithWarnings
        );
    }

    #[test]
    fn test_check_floors_at_zero() {
        let mut check = CheckResult::new();
        check.error("a", 0.6);
        check.error("b", 0.6);
        check.warn("c", 0.1);

        assert_eq!(check.score, 0.0);
        assert_eq!(check.errors.len(), 2);
        assert_eq!(check.warnings.len(), 1);
    }

    #[test]
    fn test_report_mean_and_pooling() {
        let mut checks = BTreeMap::new();
        let mut weak = CheckResult::new();
        weak.error("Missing meta_title", 0.3);
        checks.insert("seo_validation".to_string(), weak);
        checks.insert("uniqueness".to_string(), CheckResult::new());

        let report = QualityReport::from_checks(checks);
        assert!((report.overall_score - 0.85).abs() < 1e-9);
        assert_eq!(report.issues, vec!["Missing meta_title".to_string()]);
        assert_eq!(
            report.approval_status,
            ApprovalStatus::ApprovedWithWarnings
        );
        assert!(report.passed());
    }

    #[test]
    fn test_status_serializes_screaming() {
        let json = serde_json::to_string(&ApprovalStatus::ApprovedWithWarnings).unwrap();
        assert_eq!(json, "\"APPROVED_WITH_WARNINGS\"");
        assert_eq!(ApprovalStatus::Rejected.to_string(), "REJECTED");
    }
}
