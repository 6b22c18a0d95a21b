//! Leak miner: walk every flow path from a secret declaration to an
//! external sink or an unresolved node and score it.
//!
//! Traversal is depth-first with a path-local visited set, so cycles are
//! cut without hiding paths that share nodes. Successors are visited in
//! relation priority order (`injects_into`, `referenced_by`, `flows_to`),
//! then by node id, which makes the output order stable. Nodes with no
//! flow path to a terminal are never entered, and a per-graph budget of
//! traversed edges bounds the total work on dense graphs. The walk runs in
//! deepening passes (up to 2 edges, up to 4, then the full limit) so the
//! high and medium confidence paths are found before the budget can run out.

use std::collections::HashSet;

use crate::config::Config;
use crate::graph::{Node, NodeId, NodeKind, Payload, TaintGraph};
use crate::rules::sinks::network_destination;
use crate::rules::{Confidence, Finding, LeakReason, SinkKind};

#[derive(Debug, Clone, Copy)]
pub struct MinerOptions {
    /// Longest path, in edges, that is explored.
    pub max_path_edges: usize,
    /// Findings emitted per graph before mining stops.
    pub max_findings: usize,
    /// Edges traversed per graph before mining stops.
    pub max_explored_edges: usize,
}

impl Default for MinerOptions {
    fn default() -> Self {
        Self {
            max_path_edges: 16,
            max_findings: 1000,
            max_explored_edges: 200_000,
        }
    }
}

impl MinerOptions {
    /// Path-length limits of the deepening passes, ending at `max_path_edges`.
    fn passes(&self) -> Vec<usize> {
        let mut out: Vec<usize> = [2, 4]
            .into_iter()
            .filter(|&l| l < self.max_path_edges)
            .collect();
        out.push(self.max_path_edges);
        out
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            max_path_edges: config.analysis.max_path_edges,
            max_findings: config.analysis.max_findings_per_unit,
            max_explored_edges: config.analysis.max_explored_edges,
        }
    }
}

/// Which limit cut mining short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    Findings,
    Work,
}

/// Findings of one graph, plus the limit that stopped mining, if any.
#[derive(Debug, Clone, Default)]
pub struct Mined {
    pub findings: Vec<Finding>,
    pub truncated: Option<Truncation>,
    /// Edges traversed.
    pub explored: usize,
}

pub struct LeakMiner {
    options: MinerOptions,
}

impl LeakMiner {
    pub fn new(options: MinerOptions) -> Self {
        Self { options }
    }

    pub fn mine(&self, graph: &TaintGraph) -> Mined {
        let mut walk = Walk {
            graph,
            options: self.options,
            limit: 0,
            live: graph.reaching_terminals(),
            path: Vec::new(),
            on_path: HashSet::new(),
            seen: HashSet::new(),
            mined: Mined::default(),
        };
        let sources: Vec<&Node> = graph
            .sources()
            .into_iter()
            .filter(|n| walk.live.contains(&n.id))
            .collect();
        'passes: for limit in self.options.passes() {
            walk.limit = limit;
            for &source in &sources {
                if walk.mined.truncated.is_some() {
                    break 'passes;
                }
                walk.visit(source);
            }
        }
        match walk.mined.truncated {
            Some(Truncation::Findings) => tracing::warn!(
                unit = %graph.unit(),
                limit = self.options.max_findings,
                "findings limit reached; remaining paths not mined"
            ),
            Some(Truncation::Work) => tracing::warn!(
                unit = %graph.unit(),
                limit = self.options.max_explored_edges,
                findings = walk.mined.findings.len(),
                "exploration budget exhausted; remaining paths not mined"
            ),
            None => {}
        }
        walk.mined
    }
}

/// Mine a graph with default limits.
pub fn mine_findings(graph: &TaintGraph) -> Vec<Finding> {
    LeakMiner::new(MinerOptions::default()).mine(graph).findings
}

/// Confidence of a path with `edges` edges ending at `terminal`.
///
/// Non-increasing in path length for sink-terminated paths; any path ending
/// at an unresolved node is low.
pub fn score(edges: usize, terminal: &Node) -> Confidence {
    if terminal.kind.is_unresolved() {
        return Confidence::Low;
    }
    match edges {
        0..=2 => Confidence::High,
        3..=4 => Confidence::Medium,
        _ => Confidence::Low,
    }
}

struct Walk<'g> {
    graph: &'g TaintGraph,
    options: MinerOptions,
    /// Path length, in edges, of the current pass.
    limit: usize,
    /// Nodes with a flow path to a terminal.
    live: HashSet<&'g NodeId>,
    path: Vec<&'g Node>,
    on_path: HashSet<&'g NodeId>,
    seen: HashSet<Vec<NodeId>>,
    mined: Mined,
}

impl<'g> Walk<'g> {
    fn visit(&mut self, node: &'g Node) {
        if self.mined.truncated.is_some() || !self.on_path.insert(&node.id) {
            return;
        }
        self.path.push(node);

        if self.path.len() > 1 && node.kind.is_terminal() {
            self.emit();
        } else if self.path.len() <= self.limit {
            for (_, next) in self.graph.successors(&node.id) {
                if !self.live.contains(&next.id) {
                    continue;
                }
                if self.mined.explored >= self.options.max_explored_edges {
                    self.mined.truncated = Some(Truncation::Work);
                    break;
                }
                self.mined.explored += 1;
                self.visit(next);
            }
        }

        self.path.pop();
        self.on_path.remove(&node.id);
    }

    fn emit(&mut self) {
        let ids: Vec<NodeId> = self.path.iter().map(|n| n.id.clone()).collect();
        if !self.seen.insert(ids.clone()) {
            return;
        }
        if self.mined.findings.len() >= self.options.max_findings {
            self.mined.truncated = Some(Truncation::Findings);
            return;
        }
        let source = self.path[0];
        let terminal = self.path[self.path.len() - 1];
        let edges = ids.len() - 1;
        let confidence = score(edges, terminal);
        let reason = if terminal.kind.is_unresolved() {
            LeakReason::UnverifiableReference
        } else {
            match confidence {
                Confidence::High => LeakReason::DirectExposure,
                Confidence::Medium => LeakReason::IndirectExposure,
                Confidence::Low => LeakReason::DistantExposure,
            }
        };
        let (secret, exposed_as) = match &source.payload {
            Payload::Secret {
                secret, exposed_as, ..
            } => (secret.clone(), exposed_as.clone()),
            other => (other.summary(), String::new()),
        };
        let sink = match &terminal.kind {
            NodeKind::ExternalSink { sink, .. } => Some(*sink),
            _ => None,
        };
        let destination = match sink {
            Some(SinkKind::Network) => network_destination(&terminal.payload.summary()),
            _ => None,
        };
        let message = match &terminal.kind {
            NodeKind::ExternalSink { sink, pattern } => format!(
                "secret '{secret}' ({exposed_as}) reaches {sink} sink '{pattern}' in {edges} hop(s): {}",
                terminal.payload.summary()
            ),
            _ => format!(
                "secret '{secret}' ({exposed_as}) flows into '{}', which could not be inspected",
                terminal.payload.summary()
            ),
        };
        self.mined.findings.push(Finding {
            unit: self.graph.unit().to_string(),
            path: ids,
            confidence,
            reason,
            secret,
            exposed_as,
            sink,
            destination,
            source_location: source.origin.clone(),
            location: terminal.origin.clone(),
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Relation, UnresolvedCause};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn node(id: &str, kind: NodeKind) -> Node {
        let payload = if kind == NodeKind::SecretDeclaration {
            Payload::Secret {
                secret: "db".into(),
                key: Some("password".into()),
                exposed_as: "DB_PASSWORD".into(),
            }
        } else {
            Payload::text(id)
        };
        Node {
            id: NodeId::from(id),
            kind,
            origin: None,
            payload,
        }
    }

    fn sink() -> NodeKind {
        NodeKind::ExternalSink {
            sink: SinkKind::Stdout,
            pattern: "echo".into(),
        }
    }

    fn chain(g: &mut TaintGraph, ids: &[&str], relation: Relation) {
        for pair in ids.windows(2) {
            g.add_edge(&pair[0].into(), &pair[1].into(), relation).unwrap();
        }
    }

    #[test]
    fn direct_two_hop_path_is_high() {
        let mut g = TaintGraph::new("u");
        g.add_node(node("root", NodeKind::ManifestRoot));
        g.add_node(node("d", NodeKind::SecretDeclaration));
        g.add_node(node("s", NodeKind::ScriptStatement));
        g.add_node(node("k", sink()));
        g.add_edge(&"root".into(), &"d".into(), Relation::Declares).unwrap();
        g.add_edge(&"d".into(), &"s".into(), Relation::InjectsInto).unwrap();
        g.add_edge(&"s".into(), &"k".into(), Relation::FlowsTo).unwrap();

        let findings = mine_findings(&g);
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.path, vec![NodeId::from("d"), "s".into(), "k".into()]);
        assert_eq!(f.confidence, Confidence::High);
        assert_eq!(f.reason, LeakReason::DirectExposure);
        assert_eq!(f.secret, "db");
        assert_eq!(f.exposed_as, "DB_PASSWORD");
        assert_eq!(f.sink, Some(SinkKind::Stdout));
    }

    #[test]
    fn longer_paths_lose_confidence() {
        let mut g = TaintGraph::new("u");
        g.add_node(node("d", NodeKind::SecretDeclaration));
        for id in ["a", "b", "c", "e"] {
            g.add_node(node(id, NodeKind::ScriptStatement));
        }
        g.add_node(node("k", sink()));
        chain(&mut g, &["d", "a", "b", "c", "e", "k"], Relation::ReferencedBy);
        let findings = mine_findings(&g);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].edge_count(), 5);
        assert_eq!(findings[0].confidence, Confidence::Low);
        assert_eq!(findings[0].reason, LeakReason::DistantExposure);
    }

    #[test]
    fn unresolved_terminal_is_low() {
        let mut g = TaintGraph::new("u");
        g.add_node(node("d", NodeKind::SecretDeclaration));
        g.add_node(node(
            "x",
            NodeKind::Unresolved {
                cause: UnresolvedCause::NotFound,
            },
        ));
        g.add_edge(&"d".into(), &"x".into(), Relation::InjectsInto).unwrap();
        let findings = mine_findings(&g);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].confidence, Confidence::Low);
        assert_eq!(findings[0].reason, LeakReason::UnverifiableReference);
        assert_eq!(findings[0].sink, None);
    }

    #[test]
    fn cycles_terminate_and_paths_stay_simple() {
        let mut g = TaintGraph::new("u");
        g.add_node(node("d", NodeKind::SecretDeclaration));
        g.add_node(node("a", NodeKind::ScriptStatement));
        g.add_node(node("b", NodeKind::ScriptStatement));
        g.add_node(node("k", sink()));
        g.add_edge(&"d".into(), &"a".into(), Relation::InjectsInto).unwrap();
        g.add_edge(&"a".into(), &"b".into(), Relation::ReferencedBy).unwrap();
        g.add_edge(&"b".into(), &"a".into(), Relation::ReferencedBy).unwrap();
        g.add_edge(&"b".into(), &"k".into(), Relation::FlowsTo).unwrap();
        let findings = mine_findings(&g);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path.len(), 4);
    }

    #[test]
    fn no_sources_means_no_findings() {
        let mut g = TaintGraph::new("u");
        g.add_node(node("root", NodeKind::ManifestRoot));
        g.add_node(node("k", sink()));
        assert!(mine_findings(&g).is_empty());
    }

    #[test]
    fn declares_edges_are_not_followed() {
        let mut g = TaintGraph::new("u");
        g.add_node(node("d", NodeKind::SecretDeclaration));
        g.add_node(node("k", sink()));
        g.add_edge(&"d".into(), &"k".into(), Relation::Declares).unwrap();
        assert!(mine_findings(&g).is_empty());
    }

    #[test]
    fn findings_limit_truncates() {
        let mut g = TaintGraph::new("u");
        g.add_node(node("d", NodeKind::SecretDeclaration));
        for i in 0..10 {
            let id = format!("k{i}");
            g.add_node(node(&id, sink()));
            g.add_edge(&"d".into(), &NodeId::new(id), Relation::FlowsTo)
                .unwrap();
        }
        let mined = LeakMiner::new(MinerOptions {
            max_findings: 3,
            ..Default::default()
        })
        .mine(&g);
        assert_eq!(mined.findings.len(), 3);
        assert_eq!(mined.truncated, Some(Truncation::Findings));
    }

    /// Declaration feeding `n` statements, each also feeding every later one.
    fn dense_chain(n: usize) -> TaintGraph {
        let mut g = TaintGraph::new("u");
        g.add_node(node("d", NodeKind::SecretDeclaration));
        for i in 0..n {
            let id = NodeId::new(format!("v{i:02}"));
            g.add_node(node(id.as_str(), NodeKind::ScriptStatement));
            g.add_edge(&"d".into(), &id, Relation::InjectsInto).unwrap();
            for j in 0..i {
                let earlier = NodeId::new(format!("v{j:02}"));
                g.add_edge(&earlier, &id, Relation::ReferencedBy).unwrap();
            }
        }
        g
    }

    #[test]
    fn dense_graph_without_terminals_is_not_walked() {
        let g = dense_chain(40);
        let mined = LeakMiner::new(MinerOptions::default()).mine(&g);
        assert!(mined.findings.is_empty());
        assert_eq!(mined.truncated, None);
        assert_eq!(mined.explored, 0);
    }

    #[test]
    fn dense_graph_with_a_sink_stops_at_the_work_budget() {
        let mut g = dense_chain(40);
        g.add_node(node("k", sink()));
        g.add_edge(&"v39".into(), &"k".into(), Relation::FlowsTo).unwrap();

        let options = MinerOptions {
            max_explored_edges: 5_000,
            ..Default::default()
        };
        let mined = LeakMiner::new(options).mine(&g);
        assert_eq!(mined.truncated, Some(Truncation::Work));
        assert_eq!(mined.explored, 5_000);
        assert!(mined
            .findings
            .iter()
            .all(|f| f.path.last() == Some(&NodeId::from("k"))));
        // The direct path is mined before the budget runs out.
        let direct = mined
            .findings
            .iter()
            .find(|f| f.confidence == Confidence::High)
            .unwrap();
        assert_eq!(direct.path, vec![NodeId::from("d"), "v39".into(), "k".into()]);
    }

    #[test]
    fn dead_branches_do_not_count_against_the_budget() {
        let mut g = dense_chain(30);
        g.add_node(node("s", NodeKind::CommandArg));
        g.add_node(node("k", sink()));
        g.add_edge(&"d".into(), &"s".into(), Relation::InjectsInto).unwrap();
        g.add_edge(&"s".into(), &"k".into(), Relation::FlowsTo).unwrap();

        let mined = LeakMiner::new(MinerOptions {
            max_explored_edges: 10,
            ..Default::default()
        })
        .mine(&g);
        assert_eq!(mined.truncated, None);
        assert_eq!(mined.findings.len(), 1);
    }

    #[test]
    fn path_edge_limit_bounds_the_walk() {
        let mut g = TaintGraph::new("u");
        g.add_node(node("d", NodeKind::SecretDeclaration));
        for id in ["a", "b", "c"] {
            g.add_node(node(id, NodeKind::ScriptStatement));
        }
        g.add_node(node("k", sink()));
        chain(&mut g, &["d", "a", "b", "c", "k"], Relation::ReferencedBy);
        let short = LeakMiner::new(MinerOptions {
            max_path_edges: 3,
            ..Default::default()
        })
        .mine(&g);
        assert!(short.findings.is_empty());
        let long = LeakMiner::new(MinerOptions {
            max_path_edges: 4,
            ..Default::default()
        })
        .mine(&g);
        assert_eq!(long.findings.len(), 1);
    }

    #[test]
    fn shorter_paths_are_mined_first() {
        let mut g = TaintGraph::new("u");
        g.add_node(node("d", NodeKind::SecretDeclaration));
        for id in ["a", "b", "c"] {
            g.add_node(node(id, NodeKind::ScriptStatement));
        }
        g.add_node(node("k", sink()));
        chain(&mut g, &["d", "a", "b", "c", "k"], Relation::ReferencedBy);
        g.add_edge(&"d".into(), &"c".into(), Relation::InjectsInto).unwrap();

        let lengths: Vec<usize> = mine_findings(&g).iter().map(|f| f.edge_count()).collect();
        assert_eq!(lengths, vec![2, 4]);
    }

    #[test]
    fn passes_end_at_the_path_limit() {
        let passes = |max| {
            MinerOptions {
                max_path_edges: max,
                ..Default::default()
            }
            .passes()
        };
        assert_eq!(passes(16), vec![2, 4, 16]);
        assert_eq!(passes(3), vec![2, 3]);
        assert_eq!(passes(1), vec![1]);
    }

    #[test]
    fn score_is_monotonic_for_sinks() {
        let k = node("k", sink());
        let mut last = Confidence::High;
        for edges in 1..20 {
            let c = score(edges, &k);
            assert!(c <= last);
            last = c;
        }
    }

    const KINDS: usize = 5;

    fn kind_of(i: usize) -> NodeKind {
        match i % KINDS {
            0 => NodeKind::SecretDeclaration,
            1 => NodeKind::ScriptStatement,
            2 => NodeKind::CommandArg,
            3 => sink(),
            _ => NodeKind::Unresolved {
                cause: UnresolvedCause::NotFound,
            },
        }
    }

    fn relation_of(i: usize) -> Relation {
        match i % 3 {
            0 => Relation::InjectsInto,
            1 => Relation::ReferencedBy,
            _ => Relation::FlowsTo,
        }
    }

    fn arbitrary_graph() -> impl Strategy<Value = TaintGraph> {
        (2usize..12)
            .prop_flat_map(|n| {
                (
                    proptest::collection::vec(0usize..KINDS, n),
                    proptest::collection::vec((0..n, 0..n, 0usize..3), 0..(n * 3)),
                )
            })
            .prop_map(|(kinds, edges)| {
                let mut g = TaintGraph::new("prop");
                for (i, k) in kinds.iter().enumerate() {
                    g.add_node(node(&format!("n{i:02}"), kind_of(*k)));
                }
                for (a, b, r) in edges {
                    if a != b {
                        let _ = g.add_edge(
                            &NodeId::new(format!("n{a:02}")),
                            &NodeId::new(format!("n{b:02}")),
                            relation_of(r),
                        );
                    }
                }
                g
            })
    }

    proptest! {
        #[test]
        fn paths_are_connected_simple_and_well_terminated(g in arbitrary_graph()) {
            for f in mine_findings(&g) {
                let first = g.node(&f.path[0]).unwrap();
                prop_assert_eq!(&first.kind, &NodeKind::SecretDeclaration);
                let last = g.node(f.path.last().unwrap()).unwrap();
                prop_assert!(last.kind.is_sink() || last.kind.is_unresolved());
                for pair in f.path.windows(2) {
                    prop_assert!(
                        [Relation::InjectsInto, Relation::ReferencedBy, Relation::FlowsTo]
                            .iter()
                            .any(|r| g.has_edge(&pair[0], &pair[1], *r))
                    );
                }
                let distinct: HashSet<&NodeId> = f.path.iter().collect();
                prop_assert_eq!(distinct.len(), f.path.len());
            }
        }

        #[test]
        fn mining_is_idempotent(g in arbitrary_graph()) {
            prop_assert_eq!(mine_findings(&g), mine_findings(&g));
        }

        #[test]
        fn confidence_never_rises_with_length(g in arbitrary_graph()) {
            let findings: Vec<Finding> = mine_findings(&g)
                .into_iter()
                .filter(|f| f.sink.is_some())
                .collect();
            for a in &findings {
                for b in &findings {
                    if a.edge_count() < b.edge_count() {
                        prop_assert!(a.confidence >= b.confidence);
                    }
                }
            }
        }
    }
}
