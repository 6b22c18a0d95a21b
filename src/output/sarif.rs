use std::collections::BTreeSet;

use crate::error::Result;
use crate::ir::Origin;
use crate::rules::{Confidence, Finding, LeakReason};
use crate::ScanReport;

use serde_json::{json, Value};

/// Render a report as SARIF 2.1.0.
///
/// Produces a self-contained SARIF log compatible with GitHub Code Scanning
/// and other SARIF consumers. Script locations are reported as logical
/// locations; manifest fields use the manifest file as the artifact.
pub fn render(report: &ScanReport) -> Result<String> {
    let findings: Vec<&Finding> = report.findings().collect();

    let rules: Vec<Value> = findings
        .iter()
        .map(|f| f.reason)
        .collect::<BTreeSet<LeakReason>>()
        .into_iter()
        .map(|reason| {
            json!({
                "id": reason.rule_id(),
                "name": reason.to_string(),
                "shortDescription": { "text": reason.title() },
                "help": { "text": reason.remediation() },
                "defaultConfiguration": {
                    "level": level(default_confidence(reason)),
                },
            })
        })
        .collect();

    let results: Vec<Value> = findings
        .iter()
        .map(|f| {
            let mut result = json!({
                "ruleId": f.reason.rule_id(),
                "level": level(f.confidence),
                "message": { "text": f.message },
                "properties": {
                    "confidence": f.confidence,
                    "secret": f.secret,
                    "exposedAs": f.exposed_as,
                    "unit": f.unit,
                    "path": f.path,
                },
            });
            if let Some(location) = location(f) {
                result["locations"] = json!([location]);
            }
            if let Some(host) = &f.destination {
                result["properties"]["destination"] = json!(host);
            }
            result
        })
        .collect();

    let notifications: Vec<Value> = report
        .units
        .iter()
        .flat_map(|u| {
            u.diagnostics.iter().map(move |d| {
                let level = if d.kind.degrades_unit() { "warning" } else { "note" };
                json!({
                    "descriptor": { "id": d.kind.to_string() },
                    "level": level,
                    "message": { "text": format!("{}: {}", u.unit, d.message) },
                })
            })
        })
        .collect();

    let sarif = json!({
        "$schema": "https://docs.oasis-open.org/sarif/sarif/v2.1.0/errata01/os/schemas/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "kubetaint",
                    "informationUri": "https://github.com/limaronaldo/kubetaint",
                    "version": env!("CARGO_PKG_VERSION"),
                    "semanticVersion": env!("CARGO_PKG_VERSION"),
                    "rules": rules,
                },
            },
            "invocations": [{
                "executionSuccessful": true,
                "endTimeUtc": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                "toolExecutionNotifications": notifications,
            }],
            "results": results,
            "automationDetails": {
                "id": format!("kubetaint/{}", report.root.display()),
                "guid": uuid::Uuid::new_v4().to_string(),
            },
        }],
    });

    Ok(serde_json::to_string_pretty(&sarif)?)
}

fn location(finding: &Finding) -> Option<Value> {
    match finding.location.as_ref()? {
        Origin::Manifest { file, field } => Some(json!({
            "physicalLocation": {
                "artifactLocation": { "uri": file.display().to_string() },
            },
            "logicalLocations": [{ "fullyQualifiedName": field }],
        })),
        Origin::Script { script, line } => {
            let mut loc = json!({
                "logicalLocations": [{ "fullyQualifiedName": format!("{script}:{line}") }],
            });
            if let Some(path) = script.strip_prefix("file:") {
                loc["physicalLocation"] = json!({
                    "artifactLocation": { "uri": path.trim_start_matches('/') },
                    "region": { "startLine": line },
                });
            }
            Some(loc)
        }
    }
}

fn default_confidence(reason: LeakReason) -> Confidence {
    match reason {
        LeakReason::DirectExposure => Confidence::High,
        LeakReason::IndirectExposure => Confidence::Medium,
        LeakReason::DistantExposure | LeakReason::UnverifiableReference => Confidence::Low,
    }
}

fn level(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::High => "error",
        Confidence::Medium => "warning",
        Confidence::Low => "note",
    }
}
