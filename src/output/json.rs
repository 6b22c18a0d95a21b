use crate::error::Result;
use crate::loader::SkippedUnit;
use crate::rules::policy::PolicyVerdict;
use crate::{ScanReport, UnitReport};

use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    tool: &'static str,
    version: &'static str,
    root: String,
    units: &'a [UnitReport],
    skipped: &'a [SkippedUnit],
    cancelled: usize,
    verdict: &'a PolicyVerdict,
}

/// Render a report as JSON.
pub fn render(report: &ScanReport) -> Result<String> {
    let json = JsonReport {
        tool: "kubetaint",
        version: env!("CARGO_PKG_VERSION"),
        root: report.root.display().to_string(),
        units: &report.units,
        skipped: &report.skipped,
        cancelled: report.cancelled,
        verdict: &report.verdict,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}
