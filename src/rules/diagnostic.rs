use serde::{Deserialize, Serialize};

use crate::ir::Origin;

/// A local degradation recorded while building a graph. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub origin: Option<Origin>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, origin: Option<Origin>) -> Self {
        Self {
            kind,
            message: message.into(),
            origin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A manifest field was present but could not be interpreted.
    MalformedField,
    /// A referenced script could not be resolved.
    UnresolvedScript,
    /// Reference expansion stopped at the depth limit.
    DepthExceeded,
    /// A script references itself, directly or through other scripts.
    CyclicReference,
    /// envFrom names a Secret whose keys are not in the batch.
    UnknownSecretKeys,
    /// A user-name-like literal failed the identifier heuristics.
    InsecureIdentifier,
    /// The miner stopped early after reaching its findings limit.
    FindingLimit,
    /// The miner stopped early after exhausting its exploration budget.
    WorkLimit,
}

impl DiagnosticKind {
    /// Whether the unit's analysis is incomplete because of this diagnostic.
    pub fn degrades_unit(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedScript
                | Self::DepthExceeded
                | Self::FindingLimit
                | Self::WorkLimit
        )
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MalformedField => "malformed_field",
            Self::UnresolvedScript => "unresolved_script",
            Self::DepthExceeded => "depth_exceeded",
            Self::CyclicReference => "cyclic_reference",
            Self::UnknownSecretKeys => "unknown_secret_keys",
            Self::InsecureIdentifier => "insecure_identifier",
            Self::FindingLimit => "finding_limit",
            Self::WorkLimit => "work_limit",
        };
        f.write_str(s)
    }
}
