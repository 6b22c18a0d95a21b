use crate::rules::{Confidence, Finding};
use crate::ScanReport;

/// Render a report as console output: findings by confidence, then
/// degraded units and skipped documents, then the verdict.
pub fn render(report: &ScanReport) -> String {
    let mut output = String::new();
    let findings: Vec<&Finding> = report.findings().collect();

    output.push_str(&format!(
        "\n  {} unit(s) scanned under {}",
        report.units.len(),
        report.root.display()
    ));
    if !report.skipped.is_empty() {
        output.push_str(&format!(", {} skipped", report.skipped.len()));
    }
    if report.cancelled > 0 {
        output.push_str(&format!(", {} cancelled", report.cancelled));
    }
    output.push('\n');

    if findings.is_empty() {
        output.push_str("\n  No secret leaks detected.\n\n");
    } else {
        let mut sorted = findings.clone();
        sorted.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| a.unit.cmp(&b.unit))
        });

        output.push_str(&format!("\n  {} finding(s) detected:\n\n", sorted.len()));
        for finding in &sorted {
            let tag = match finding.confidence {
                Confidence::High => "[HIGH]  ",
                Confidence::Medium => "[MEDIUM]",
                Confidence::Low => "[LOW]   ",
            };
            output.push_str(&format!(
                "  {} {} {}\n",
                tag,
                finding.reason.rule_id(),
                finding.message
            ));
            let at = finding
                .location
                .as_ref()
                .map(|l| l.to_string())
                .unwrap_or_else(|| finding.unit.clone());
            output.push_str(&format!("           at {at}\n"));
            if let Some(source) = &finding.source_location {
                output.push_str(&format!("           from {source}\n"));
            }
            if let Some(host) = &finding.destination {
                output.push_str(&format!("           to {host}\n"));
            }
            let path: Vec<&str> = finding.path.iter().map(|n| n.as_str()).collect();
            output.push_str(&format!("           path {}\n", path.join(" -> ")));
            output.push_str(&format!(
                "           fix: {}\n\n",
                finding.reason.remediation()
            ));
        }
    }

    let noted: Vec<_> = report
        .units
        .iter()
        .filter(|u| !u.diagnostics.is_empty())
        .collect();
    if !noted.is_empty() {
        output.push_str("  Diagnostics:\n");
        for unit in noted {
            let marker = if unit.degraded() { " (degraded)" } else { "" };
            output.push_str(&format!("    {}{}\n", unit.unit, marker));
            for d in &unit.diagnostics {
                output.push_str(&format!("      [{}] {}\n", d.kind, d.message));
            }
        }
        output.push('\n');
    }

    if !report.skipped.is_empty() {
        output.push_str("  Skipped:\n");
        for s in &report.skipped {
            output.push_str(&format!("    {}\n", s.reason));
        }
        output.push('\n');
    }

    let status = if report.verdict.pass { "PASS" } else { "FAIL" };
    output.push_str(&format!(
        "  Result: {} (threshold: {}, highest: {})\n\n",
        status,
        report.verdict.fail_threshold,
        report
            .verdict
            .highest_confidence
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".into()),
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    #[test]
    fn lists_findings_diagnostics_and_verdict() {
        let text = render(&fixtures::report());
        assert!(text.contains("2 finding(s) detected"));
        assert!(text.contains("[HIGH]   KT-001"));
        assert!(text.contains("to hooks.example.com"));
        assert!(text.contains("path c:debug:env:TOKEN -> c:debug:inline:debug:1.0"));
        assert!(text.contains("(degraded)"));
        assert!(text.contains("[unresolved_script]"));
        assert!(text.contains("Result: FAIL (threshold: medium, highest: high)"));
        // High findings come first.
        assert!(text.find("KT-001").unwrap() < text.find("KT-004").unwrap());
    }

    #[test]
    fn empty_report_says_so() {
        let mut report = fixtures::report();
        report.units[0].findings.clear();
        report.units[0].diagnostics.clear();
        let text = render(&report);
        assert!(text.contains("No secret leaks detected"));
        assert!(!text.contains("Diagnostics:"));
    }
}
