//! Taint graph: nodes for secret provenance and consumption, edges for flow.
//!
//! One `TaintGraph` is built per manifest unit, mined once and dropped.
//! Storage is a petgraph `DiGraph` plus an id index; edges are deduplicated
//! on `(from, to, relation)` so re-inserting an edge is a no-op.

pub mod export;

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ir::Origin;
use crate::rules::{Diagnostic, SinkKind};

/// Stable node identifier, unique within one graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum NodeKind {
    /// Synthetic per-manifest root; declares every secret source.
    ManifestRoot,
    SecretDeclaration,
    EnvVarRef,
    VolumeMountRef,
    CommandArg,
    ScriptStatement,
    /// A statement that emits data out of the pod. Always carries the sink
    /// pattern that matched it.
    ExternalSink { sink: SinkKind, pattern: String },
    /// Placeholder for a reference that could not be followed.
    Unresolved { cause: UnresolvedCause },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ManifestRoot => "manifest_root",
            Self::SecretDeclaration => "secret_declaration",
            Self::EnvVarRef => "env_var_ref",
            Self::VolumeMountRef => "volume_mount_ref",
            Self::CommandArg => "command_arg",
            Self::ScriptStatement => "script_statement",
            Self::ExternalSink { .. } => "external_sink",
            Self::Unresolved { .. } => "unresolved",
        }
    }

    pub fn is_sink(&self) -> bool {
        matches!(self, Self::ExternalSink { .. })
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved { .. })
    }

    /// Sinks and unresolved placeholders end a mined path.
    pub fn is_terminal(&self) -> bool {
        self.is_sink() || self.is_unresolved()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedCause {
    NotFound,
    Unreadable,
    /// Expansion stopped at the maximum reference depth.
    DepthExceeded,
}

impl std::fmt::Display for UnresolvedCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Unreadable => write!(f, "unreadable"),
            Self::DepthExceeded => write!(f, "reference depth exceeded"),
        }
    }
}

/// Literal or symbolic value attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Payload {
    None,
    /// A secret (or one key of it) and the name it is exposed under:
    /// an env var name, an envFrom prefix or a mount path.
    Secret {
        secret: String,
        key: Option<String>,
        exposed_as: String,
    },
    Name { name: String },
    Path { path: String },
    Text { text: String },
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Short human label.
    pub fn summary(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Secret {
                secret,
                key: Some(key),
                ..
            } => format!("{secret}/{key}"),
            Self::Secret { secret, .. } => secret.clone(),
            Self::Name { name } => name.clone(),
            Self::Path { path } => path.clone(),
            Self::Text { text } => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub origin: Option<Origin>,
    pub payload: Payload,
}

/// Edge relation. Declaration order is traversal priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Declares,
    InjectsInto,
    ReferencedBy,
    FlowsTo,
}

impl Relation {
    /// Whether the miner follows this relation.
    pub fn is_flow(self) -> bool {
        !matches!(self, Self::Declares)
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Declares => write!(f, "declares"),
            Self::InjectsInto => write!(f, "injects_into"),
            Self::ReferencedBy => write!(f, "referenced_by"),
            Self::FlowsTo => write!(f, "flows_to"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub relation: Relation,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("edge endpoint '{0}' is not a node of this graph")]
    MissingEndpoint(NodeId),
}

#[derive(Debug, Clone, Default)]
pub struct TaintGraph {
    unit: String,
    graph: DiGraph<Node, Relation>,
    index: HashMap<NodeId, NodeIndex>,
    edge_set: HashSet<(NodeIndex, NodeIndex, Relation)>,
    diagnostics: Vec<Diagnostic>,
}

impl TaintGraph {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..Default::default()
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Insert a node. Returns `false` (and keeps the existing node) when the
    /// id is already present.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        true
    }

    /// Insert an edge. Both endpoints must exist. Returns `Ok(false)` when
    /// the identical edge is already present.
    pub fn add_edge(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        relation: Relation,
    ) -> Result<bool, GraphError> {
        let a = *self
            .index
            .get(from)
            .ok_or_else(|| GraphError::MissingEndpoint(from.clone()))?;
        let b = *self
            .index
            .get(to)
            .ok_or_else(|| GraphError::MissingEndpoint(to.clone()))?;
        if !self.edge_set.insert((a, b, relation)) {
            return Ok(false);
        }
        self.graph.add_edge(a, b, relation);
        Ok(true)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    pub fn has_edge(&self, from: &NodeId, to: &NodeId, relation: Relation) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => self.edge_set.contains(&(a, b, relation)),
            _ => false,
        }
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.graph
            .edge_references()
            .map(|e| Edge {
                from: self.graph[e.source()].id.clone(),
                to: self.graph[e.target()].id.clone(),
                relation: *e.weight(),
            })
            .collect()
    }

    /// Outgoing flow edges of `id`, ordered by relation priority then target id.
    pub fn successors(&self, id: &NodeId) -> Vec<(Relation, &Node)> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<(Relation, &Node)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().is_flow())
            .map(|e| (*e.weight(), &self.graph[e.target()]))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        out
    }

    /// Ids of every node with a flow path to a terminal node, terminals
    /// included. Computed by a backward walk from the terminals.
    pub fn reaching_terminals(&self) -> HashSet<&NodeId> {
        let mut queue: VecDeque<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| self.graph[idx].kind.is_terminal())
            .collect();
        let mut seen: HashSet<NodeIndex> = queue.iter().copied().collect();
        while let Some(idx) = queue.pop_front() {
            for e in self.graph.edges_directed(idx, Direction::Incoming) {
                if e.weight().is_flow() && seen.insert(e.source()) {
                    queue.push_back(e.source());
                }
            }
        }
        seen.into_iter().map(|idx| &self.graph[idx].id).collect()
    }

    /// Number of incoming edges of any relation.
    pub fn in_degree(&self, id: &NodeId) -> usize {
        self.index
            .get(id)
            .map(|&idx| self.graph.edges_directed(idx, Direction::Incoming).count())
            .unwrap_or(0)
    }

    /// All `SecretDeclaration` nodes, sorted by id.
    pub fn sources(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = self
            .nodes()
            .filter(|n| n.kind == NodeKind::SecretDeclaration)
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Order-independent view of the node and edge sets.
    pub fn fingerprint(&self) -> (BTreeSet<NodeId>, BTreeSet<Edge>) {
        (
            self.index.keys().cloned().collect(),
            self.edges().into_iter().collect(),
        )
    }

    pub(crate) fn inner(&self) -> &DiGraph<Node, Relation> {
        &self.graph
    }
}
