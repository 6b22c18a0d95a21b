use serde::{Deserialize, Serialize};

use super::SinkKind;
use crate::graph::NodeId;
use crate::ir::Origin;

/// A mined source-to-sink path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Unit (manifest document) the path was mined from.
    pub unit: String,
    /// Node ids from the secret declaration to the terminal node.
    pub path: Vec<NodeId>,
    pub confidence: Confidence,
    pub reason: LeakReason,
    /// Name of the Kubernetes Secret.
    pub secret: String,
    /// Env var name, envFrom prefix or mount path the secret is exposed as.
    pub exposed_as: String,
    /// Sink class, when the path ends at an external sink.
    pub sink: Option<SinkKind>,
    /// Host a network sink sends to, when it can be read off the statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Origin of the secret declaration.
    pub source_location: Option<Origin>,
    /// Origin of the terminal node.
    pub location: Option<Origin>,
    pub message: String,
}

impl Finding {
    /// Number of edges in the path.
    pub fn edge_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Which leak heuristic produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakReason {
    /// Secret reaches a sink within two hops, e.g. `echo $PASSWORD`.
    DirectExposure,
    /// Secret reaches a sink through up to four hops.
    IndirectExposure,
    /// Secret reaches a sink through a longer chain.
    DistantExposure,
    /// Secret flows into a script that could not be inspected.
    UnverifiableReference,
}

impl LeakReason {
    pub const ALL: [LeakReason; 4] = [
        Self::DirectExposure,
        Self::IndirectExposure,
        Self::DistantExposure,
        Self::UnverifiableReference,
    ];

    pub fn rule_id(&self) -> &'static str {
        match self {
            Self::DirectExposure => "KT-001",
            Self::IndirectExposure => "KT-002",
            Self::DistantExposure => "KT-003",
            Self::UnverifiableReference => "KT-004",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::DirectExposure => "Secret directly exposed",
            Self::IndirectExposure => "Secret exposed through references",
            Self::DistantExposure => "Secret exposed through a long reference chain",
            Self::UnverifiableReference => "Secret passed to an unresolved reference",
        }
    }

    pub fn remediation(&self) -> &'static str {
        match self {
            Self::UnverifiableReference => {
                "Make the referenced script available to the scan (ConfigMap in the batch \
                 or a file next to the manifest) so the flow can be verified."
            }
            _ => {
                "Do not print, log or transmit secret values. Pass secrets to tools through \
                 files or stdin instead of echoing them, and disable shell tracing."
            }
        }
    }
}

impl std::fmt::Display for LeakReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectExposure => write!(f, "direct_exposure"),
            Self::IndirectExposure => write!(f, "indirect_exposure"),
            Self::DistantExposure => write!(f, "distant_exposure"),
            Self::UnverifiableReference => write!(f, "unverifiable_reference"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_orders_low_to_high() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
    }

    #[test]
    fn lenient_confidence_parsing() {
        assert_eq!(Confidence::from_str_lenient("HIGH"), Some(Confidence::High));
        assert_eq!(Confidence::from_str_lenient("med"), Some(Confidence::Medium));
        assert_eq!(Confidence::from_str_lenient("critical"), None);
    }

    #[test]
    fn rule_ids_are_unique() {
        let mut ids: Vec<_> = LeakReason::ALL.iter().map(|r| r.rule_id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), LeakReason::ALL.len());
    }
}
