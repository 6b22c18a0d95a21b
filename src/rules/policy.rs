use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Confidence, Finding, LeakReason};

/// Policy verdict: the final pass/fail decision after applying
/// the ignore lists to raw findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub pass: bool,
    pub total_findings: usize,
    pub effective_findings: usize,
    pub highest_confidence: Option<Confidence>,
    pub fail_threshold: Confidence,
}

/// Policy configuration loaded from `.kubetaint.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Minimum confidence to fail the scan.
    #[serde(default = "default_fail_on")]
    pub fail_on: Confidence,
    /// Secret names whose findings are dropped.
    #[serde(default)]
    pub ignore_secrets: HashSet<String>,
    /// Leak heuristics whose findings are dropped.
    #[serde(default)]
    pub ignore_reasons: HashSet<LeakReason>,
}

fn default_fail_on() -> Confidence {
    Confidence::Medium
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            fail_on: default_fail_on(),
            ignore_secrets: HashSet::new(),
            ignore_reasons: HashSet::new(),
        }
    }
}

impl Policy {
    fn keeps(&self, finding: &Finding) -> bool {
        !self.ignore_secrets.contains(&finding.secret)
            && !self.ignore_reasons.contains(&finding.reason)
    }

    /// Evaluate findings against this policy and produce a verdict.
    pub fn evaluate(&self, findings: &[Finding]) -> PolicyVerdict {
        let effective: Vec<Confidence> = findings
            .iter()
            .filter(|f| self.keeps(f))
            .map(|f| f.confidence)
            .collect();

        let highest = effective.iter().copied().max();
        let failed = effective.iter().any(|&c| c >= self.fail_on);

        PolicyVerdict {
            pass: !failed,
            total_findings: findings.len(),
            effective_findings: effective.len(),
            highest_confidence: highest,
            fail_threshold: self.fail_on,
        }
    }

    /// Filter findings: remove ignored secrets and reasons.
    pub fn apply(&self, findings: Vec<Finding>) -> Vec<Finding> {
        findings.into_iter().filter(|f| self.keeps(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_finding(secret: &str, reason: LeakReason, confidence: Confidence) -> Finding {
        Finding {
            unit: "u".into(),
            path: vec![],
            confidence,
            reason,
            secret: secret.into(),
            exposed_as: "X".into(),
            sink: None,
            destination: None,
            source_location: None,
            location: None,
            message: "test".into(),
        }
    }

    #[test]
    fn default_policy_fails_on_medium() {
        let policy = Policy::default();
        let findings = vec![make_finding("db", LeakReason::IndirectExposure, Confidence::Medium)];
        assert!(!policy.evaluate(&findings).pass);
    }

    #[test]
    fn default_policy_passes_on_low() {
        let policy = Policy::default();
        let findings = vec![make_finding(
            "db",
            LeakReason::UnverifiableReference,
            Confidence::Low,
        )];
        let verdict = policy.evaluate(&findings);
        assert!(verdict.pass);
        assert_eq!(verdict.highest_confidence, Some(Confidence::Low));
    }

    #[test]
    fn ignored_secret_removes_finding() {
        let mut policy = Policy::default();
        policy.ignore_secrets.insert("db".into());
        let findings = vec![make_finding("db", LeakReason::DirectExposure, Confidence::High)];
        let verdict = policy.evaluate(&findings);
        assert!(verdict.pass);
        assert_eq!(verdict.effective_findings, 0);
        assert!(policy.apply(findings).is_empty());
    }

    #[test]
    fn ignored_reason_removes_finding() {
        let mut policy = Policy::default();
        policy.ignore_reasons.insert(LeakReason::DirectExposure);
        let findings = vec![
            make_finding("db", LeakReason::DirectExposure, Confidence::High),
            make_finding("db", LeakReason::DistantExposure, Confidence::Low),
        ];
        let kept = policy.apply(findings);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].reason, LeakReason::DistantExposure);
    }
}
