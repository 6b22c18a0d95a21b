pub mod console;
pub mod json;
pub mod sarif;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ScanReport;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
    Sarif,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Some(Self::Console),
            "json" => Some(Self::Json),
            "sarif" => Some(Self::Sarif),
            _ => None,
        }
    }
}

/// Render a scan report into the specified format.
pub fn render(report: &ScanReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render(report)),
        OutputFormat::Json => json::render(report),
        OutputFormat::Sarif => sarif::render(report),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::PathBuf;

    use crate::graph::NodeId;
    use crate::ir::Origin;
    use crate::rules::policy::Policy;
    use crate::rules::{Confidence, Diagnostic, DiagnosticKind, Finding, LeakReason, SinkKind};
    use crate::{ScanReport, UnitReport};

    pub fn report() -> ScanReport {
        let findings = vec![
            Finding {
                unit: "k8s/app.yaml#1/Pod/debug".into(),
                path: vec![
                    NodeId::from("c:debug:env:TOKEN"),
                    "c:debug:inline:debug:1.0".into(),
                    "c:debug:inline:debug:1.0:sink".into(),
                ],
                confidence: Confidence::High,
                reason: LeakReason::DirectExposure,
                secret: "api".into(),
                exposed_as: "TOKEN".into(),
                sink: Some(SinkKind::Network),
                destination: Some("hooks.example.com".into()),
                source_location: Some(Origin::manifest(
                    "k8s/app.yaml",
                    "spec.containers[0].env[0]",
                )),
                location: Some(Origin::script("inline:debug", 1)),
                message: "secret 'api' (TOKEN) reaches network sink 'curl'".into(),
            },
            Finding {
                unit: "k8s/app.yaml#1/Pod/debug".into(),
                path: vec![
                    NodeId::from("c:debug:env:TOKEN"),
                    "c:debug:unresolved:file:/run.sh".into(),
                ],
                confidence: Confidence::Low,
                reason: LeakReason::UnverifiableReference,
                secret: "api".into(),
                exposed_as: "TOKEN".into(),
                sink: None,
                destination: None,
                source_location: None,
                location: Some(Origin::manifest("k8s/app.yaml", "spec.containers[0]")),
                message: "secret 'api' (TOKEN) flows into 'file:/run.sh'".into(),
            },
        ];
        let verdict = Policy::default().evaluate(&findings);
        ScanReport {
            root: PathBuf::from("k8s"),
            units: vec![UnitReport {
                unit: "k8s/app.yaml#1/Pod/debug".into(),
                file: PathBuf::from("k8s/app.yaml"),
                kind: "Pod".into(),
                name: "debug".into(),
                content_hash: "00".repeat(32),
                findings,
                diagnostics: vec![Diagnostic::new(
                    DiagnosticKind::UnresolvedScript,
                    "script not found: file:/run.sh",
                    Some(Origin::manifest("k8s/app.yaml", "spec.containers[0]")),
                )],
                node_count: 6,
                edge_count: 5,
            }],
            skipped: vec![],
            cancelled: 0,
            verdict,
        }
    }
}
