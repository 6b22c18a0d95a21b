use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::identifier::IdentifierPolicy;
use crate::error::{Result, TaintError};
use crate::rules::policy::Policy;
use crate::rules::sinks::{builtin_patterns, SinkMatcher, SinkPattern};

/// Top-level configuration from `.kubetaint.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub sinks: SinkSettings,
    #[serde(default)]
    pub identifiers: IdentifierPolicy,
    #[serde(default)]
    pub scan: ScanSettings,
}

/// Bounds for graph construction and mining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Nested script references followed before truncating.
    #[serde(default = "default_reference_depth")]
    pub max_reference_depth: usize,
    /// Longest path (in edges) the miner explores.
    #[serde(default = "default_path_edges")]
    pub max_path_edges: usize,
    #[serde(default = "default_findings_per_unit")]
    pub max_findings_per_unit: usize,
    /// Edges the miner may traverse per unit before giving up.
    #[serde(default = "default_explored_edges")]
    pub max_explored_edges: usize,
}

fn default_reference_depth() -> usize {
    10
}

fn default_path_edges() -> usize {
    16
}

fn default_findings_per_unit() -> usize {
    1000
}

fn default_explored_edges() -> usize {
    200_000
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_reference_depth: default_reference_depth(),
            max_path_edges: default_path_edges(),
            max_findings_per_unit: default_findings_per_unit(),
            max_explored_edges: default_explored_edges(),
        }
    }
}

/// Which statements count as external sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSettings {
    /// Start from the built-in pattern set.
    #[serde(default = "default_true")]
    pub use_defaults: bool,
    /// Names of built-in patterns to drop.
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Additional patterns.
    #[serde(default)]
    pub patterns: Vec<SinkPattern>,
}

fn default_true() -> bool {
    true
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            use_defaults: true,
            disabled: Vec::new(),
            patterns: Vec::new(),
        }
    }
}

impl SinkSettings {
    /// Effective pattern list, before compilation.
    pub fn effective_patterns(&self) -> Vec<SinkPattern> {
        let mut out = if self.use_defaults {
            builtin_patterns()
        } else {
            Vec::new()
        };
        out.extend(self.patterns.iter().cloned());
        out.retain(|p| !self.disabled.contains(&p.name));
        out
    }

    pub fn matcher(&self) -> Result<SinkMatcher> {
        SinkMatcher::new(self.effective_patterns())
    }
}

/// Manifest discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Glob patterns (relative to the scan root) to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_file_bytes() -> u64 {
    1_048_576
}

fn default_max_depth() -> usize {
    16
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            max_file_bytes: default_max_file_bytes(),
            max_depth: default_max_depth(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.identifiers.min_length > self.identifiers.max_length {
            return Err(TaintError::Config(format!(
                "identifiers.min_length ({}) is greater than max_length ({})",
                self.identifiers.min_length, self.identifiers.max_length
            )));
        }
        for pattern in &self.scan.exclude {
            glob::Pattern::new(pattern).map_err(|e| {
                TaintError::Config(format!("invalid exclude glob '{pattern}': {e}"))
            })?;
        }
        Ok(())
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# kubetaint configuration

[policy]
# Minimum confidence that fails the scan (low, medium, high).
fail_on = "medium"

# Secrets whose findings are ignored.
# ignore_secrets = ["demo-credentials"]

# Heuristics to ignore (direct_exposure, indirect_exposure,
# distant_exposure, unverifiable_reference).
# ignore_reasons = ["unverifiable_reference"]

[analysis]
max_reference_depth = 10
max_path_edges = 16
max_findings_per_unit = 1000
max_explored_edges = 200000

[sinks]
use_defaults = true
# disabled = ["cat"]

# [[sinks.patterns]]
# name = "vault-write"
# kind = "network"
# regex = '\bvault\s+write\b'

[identifiers]
min_length = 6
max_length = 64

[scan]
# exclude = ["charts/**/templates/**"]
max_file_bytes = 1048576
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Confidence, LeakReason, SinkKind};

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/.kubetaint.toml")).unwrap();
        assert_eq!(config.policy.fail_on, Confidence::Medium);
        assert_eq!(config.analysis.max_reference_depth, 10);
        assert_eq!(config.analysis.max_explored_edges, 200_000);
        assert!(config.sinks.use_defaults);
    }

    #[test]
    fn exploration_budget_is_configurable() {
        let config: Config = toml::from_str("[analysis]\nmax_explored_edges = 500\n").unwrap();
        assert_eq!(config.analysis.max_explored_edges, 500);
        assert_eq!(config.analysis.max_path_edges, 16);
    }

    #[test]
    fn starter_config_parses() {
        let config: Config = toml::from_str(Config::starter_toml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.identifiers, IdentifierPolicy::default());
    }

    #[test]
    fn sink_settings_add_and_disable() {
        let config: Config = toml::from_str(
            r#"
[policy]
ignore_reasons = ["unverifiable_reference"]

[sinks]
disabled = ["cat", "print"]

[[sinks.patterns]]
name = "vault-write"
kind = "network"
regex = '\bvault\s+write\b'
"#,
        )
        .unwrap();
        assert!(config
            .policy
            .ignore_reasons
            .contains(&LeakReason::UnverifiableReference));
        let names: Vec<String> = config
            .sinks
            .effective_patterns()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert!(!names.contains(&"cat".to_string()));
        assert!(names.contains(&"vault-write".to_string()));
        let matcher = config.sinks.matcher().unwrap();
        assert_eq!(
            matcher.find("vault write secret/x value=$T").unwrap().kind,
            SinkKind::Network
        );
    }

    #[test]
    fn inverted_identifier_bounds_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".kubetaint.toml");
        std::fs::write(&path, "[identifiers]\nmin_length = 10\nmax_length = 4\n").unwrap();
        assert!(matches!(Config::load(&path), Err(TaintError::Config(_))));
    }
}
