//! kubetaint: static secret-leak detection for Kubernetes manifests.
//!
//! Every manifest document is turned into a taint graph (secret sources,
//! the env vars, mounts, arguments and script statements they reach, and
//! the external sinks at the end), then mined for source-to-sink paths.
//! Each unit is analyzed independently; a bad document or an unreadable
//! script degrades that unit only.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use kubetaint::{scan, ScanOptions};
//!
//! let options = ScanOptions::default();
//! let report = scan(Path::new("./deploy"), &options).unwrap();
//! println!("Pass: {}, Findings: {}", report.verdict.pass, report.findings().count());
//! ```

pub mod analysis;
pub mod cancel;
pub mod config;
pub mod error;
pub mod graph;
pub mod ir;
pub mod loader;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod rules;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use analysis::{BuilderOptions, GraphBuilder, LeakMiner, MinerOptions, Truncation};
use config::Config;
use error::Result;
use ir::{ClusterIndex, Manifest};
use loader::{LoadOptions, SkippedUnit};
use output::OutputFormat;
use resolver::FsResolver;
use rules::policy::PolicyVerdict;
use rules::{Confidence, Diagnostic, DiagnosticKind, Finding};

pub use analysis::{build_graph, check_identifier, mine_findings, Verdict};
pub use cancel::CancellationToken;
pub use graph::TaintGraph;

/// Config file looked up in the scan root when none is given.
pub const CONFIG_FILE: &str = ".kubetaint.toml";

/// Options for a scan invocation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Path to config file (defaults to `.kubetaint.toml` in the scan root).
    pub config_path: Option<PathBuf>,
    /// Output format.
    pub format: OutputFormat,
    /// CLI override for the fail_on threshold.
    pub fail_on_override: Option<Confidence>,
    pub cancel: Option<CancellationToken>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            format: OutputFormat::Console,
            fail_on_override: None,
            cancel: None,
        }
    }
}

/// Result of analyzing one manifest document.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub unit: String,
    pub file: PathBuf,
    pub kind: String,
    pub name: String,
    pub content_hash: String,
    pub findings: Vec<Finding>,
    pub diagnostics: Vec<Diagnostic>,
    pub node_count: usize,
    pub edge_count: usize,
}

impl UnitReport {
    /// Whether part of this unit could not be analyzed.
    pub fn degraded(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind.degrades_unit())
    }
}

/// Complete scan report.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub units: Vec<UnitReport>,
    pub skipped: Vec<SkippedUnit>,
    /// Units not analyzed because the scan was cancelled.
    pub cancelled: usize,
    pub verdict: PolicyVerdict,
}

impl ScanReport {
    /// Findings kept by the policy, across all units.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.units.iter().flat_map(|u| u.findings.iter())
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.units.iter().flat_map(|u| u.diagnostics.iter())
    }

    pub fn degraded_units(&self) -> usize {
        self.units.iter().filter(|u| u.degraded()).count()
    }
}

/// Load the config for a scan root, honoring an explicit path.
pub fn load_config(root: &Path, config_path: Option<&Path>) -> Result<Config> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => config_dir(root).join(CONFIG_FILE),
    };
    Config::load(&path)
}

fn config_dir(root: &Path) -> &Path {
    if root.is_file() {
        root.parent().unwrap_or(Path::new("."))
    } else {
        root
    }
}

/// Run a complete scan: load manifests, build and mine one graph per unit,
/// evaluate policy.
pub fn scan(root: &Path, options: &ScanOptions) -> Result<ScanReport> {
    let mut config = load_config(root, options.config_path.as_deref())?;
    if let Some(fail_on) = options.fail_on_override {
        config.policy.fail_on = fail_on;
    }

    let load_options = LoadOptions::from_settings(&config.scan)?;
    let batch = loader::load_batch(root, &load_options)?;
    let cluster = ClusterIndex::from_manifests(&batch.manifests);
    let builder_options = BuilderOptions::from_config(&config)?;
    let builder = GraphBuilder::new(&builder_options).with_cluster(&cluster);
    let miner = LeakMiner::new(MinerOptions::from_config(&config));
    let scan_root = config_dir(root);

    tracing::info!(
        root = %root.display(),
        units = batch.manifests.len(),
        skipped = batch.skipped.len(),
        "scanning manifests"
    );

    let analyzed: Vec<Option<UnitReport>> = batch
        .manifests
        .par_iter()
        .map(|manifest| {
            if options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                return None;
            }
            Some(analyze_unit(
                manifest,
                &builder,
                &miner,
                &cluster,
                scan_root,
                config.scan.max_file_bytes,
            ))
        })
        .collect();

    let cancelled = analyzed.iter().filter(|u| u.is_none()).count();
    if cancelled > 0 {
        tracing::warn!(cancelled, "scan cancelled; remaining units not analyzed");
    }
    let mut units: Vec<UnitReport> = analyzed.into_iter().flatten().collect();

    let all_findings: Vec<Finding> = units
        .iter()
        .flat_map(|u| u.findings.iter().cloned())
        .collect();
    let verdict = config.policy.evaluate(&all_findings);
    for unit in &mut units {
        unit.findings = config.policy.apply(std::mem::take(&mut unit.findings));
    }

    Ok(ScanReport {
        root: root.to_path_buf(),
        units,
        skipped: batch.skipped,
        cancelled,
        verdict,
    })
}

fn analyze_unit(
    manifest: &Manifest,
    builder: &GraphBuilder<'_>,
    miner: &LeakMiner,
    cluster: &ClusterIndex,
    scan_root: &Path,
    max_script_bytes: u64,
) -> UnitReport {
    let manifest_dir = manifest.file.parent().unwrap_or(scan_root);
    let resolver =
        FsResolver::new(manifest_dir, scan_root, cluster).with_max_bytes(max_script_bytes);
    let mut graph = builder.build(manifest, &resolver);
    let mined = miner.mine(&graph);

    let mut diagnostics = graph.take_diagnostics();
    match mined.truncated {
        Some(Truncation::Findings) => diagnostics.push(Diagnostic::new(
            DiagnosticKind::FindingLimit,
            format!("stopped after {} findings", mined.findings.len()),
            None,
        )),
        Some(Truncation::Work) => diagnostics.push(Diagnostic::new(
            DiagnosticKind::WorkLimit,
            format!(
                "stopped after traversing {} edges with {} findings",
                mined.explored,
                mined.findings.len()
            ),
            None,
        )),
        None => {}
    }

    UnitReport {
        unit: manifest.unit_id(),
        file: manifest.file.clone(),
        kind: manifest.kind.clone(),
        name: manifest.name.clone(),
        content_hash: manifest.content_hash.clone(),
        findings: mined.findings,
        diagnostics,
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
    }
}

/// Build the taint graph of every unit under `root`, for inspection.
pub fn build_graphs(root: &Path, config: &Config) -> Result<Vec<TaintGraph>> {
    let batch = loader::load_batch(root, &LoadOptions::from_settings(&config.scan)?)?;
    let cluster = ClusterIndex::from_manifests(&batch.manifests);
    let builder_options = BuilderOptions::from_config(config)?;
    let builder = GraphBuilder::new(&builder_options).with_cluster(&cluster);
    let scan_root = config_dir(root);
    Ok(batch
        .manifests
        .iter()
        .map(|manifest| {
            let dir = manifest.file.parent().unwrap_or(scan_root);
            let resolver = FsResolver::new(dir, scan_root, &cluster)
                .with_max_bytes(config.scan.max_file_bytes);
            builder.build(manifest, &resolver)
        })
        .collect())
}

/// Render a scan report in the specified format.
pub fn render_report(report: &ScanReport, format: OutputFormat) -> Result<String> {
    output::render(report, format)
}
