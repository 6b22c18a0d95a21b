//! Typed intermediate representation of Kubernetes manifests.
//!
//! The loader produces `Manifest` values. The graph builder consumes them.
//! Raw YAML never reaches the analysis layer: every shape the builder cares
//! about is a tagged variant here, so malformed input is rejected (or
//! degraded to a `FieldIssue`) at conversion time.

pub mod cluster;
pub mod manifest;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use cluster::ClusterIndex;
pub use manifest::{
    Container, EnvFrom, EnvFromSource, EnvSource, EnvVar, FieldIssue, KeyToPath, Manifest,
    PodSpec, ResourceBody, Volume, VolumeMount, VolumeSource,
};

/// Where a graph node came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Origin {
    /// A field inside a manifest document, e.g.
    /// `spec.template.spec.containers[0].env[2]`.
    Manifest { file: PathBuf, field: String },
    /// A logical statement of a shell script (1-based line).
    Script { script: String, line: usize },
}

impl Origin {
    pub fn manifest(file: impl Into<PathBuf>, field: impl Into<String>) -> Self {
        Self::Manifest {
            file: file.into(),
            field: field.into(),
        }
    }

    pub fn script(script: impl Into<String>, line: usize) -> Self {
        Self::Script {
            script: script.into(),
            line,
        }
    }

    /// File-ish label used by reporters (manifest path or script reference).
    pub fn file_label(&self) -> String {
        match self {
            Self::Manifest { file, .. } => file.display().to_string(),
            Self::Script { script, .. } => script.clone(),
        }
    }

    /// Line number, when the origin is line-addressed.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Manifest { .. } => None,
            Self::Script { line, .. } => Some(*line),
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manifest { file, field } => write!(f, "{}#{}", file.display(), field),
            Self::Script { script, line } => write!(f, "{}:{}", script, line),
        }
    }
}
