use super::{NodeKind, TaintGraph};

/// Render a taint graph as DOT (Graphviz).
pub fn to_dot(graph: &TaintGraph) -> String {
    let inner = graph.inner();
    let mut lines = Vec::new();
    lines.push(format!("digraph \"{}\" {{", escape(graph.unit())));
    lines.push("    rankdir=LR;".to_string());
    lines.push("    node [shape=box, style=\"rounded,filled\", fontname=\"Helvetica\"];".to_string());
    lines.push(String::new());

    for idx in inner.node_indices() {
        let node = &inner[idx];
        let label = format!("{}\\n{}", node.kind.label(), escape(&node.payload.summary()));
        lines.push(format!(
            "    \"{}\" [label=\"{}\", fillcolor=\"{}\"];",
            escape(node.id.as_str()),
            label,
            color(&node.kind)
        ));
    }

    lines.push(String::new());

    for edge in graph.edges() {
        lines.push(format!(
            "    \"{}\" -> \"{}\" [label=\"{}\"];",
            escape(edge.from.as_str()),
            escape(edge.to.as_str()),
            edge.relation
        ));
    }

    lines.push("}".to_string());
    lines.join("\n")
}

/// Render a taint graph as a Mermaid flowchart.
pub fn to_mermaid(graph: &TaintGraph) -> String {
    let inner = graph.inner();
    let mut lines = vec!["graph LR".to_string()];

    for idx in inner.node_indices() {
        let node = &inner[idx];
        let label = format!("{}: {}", node.kind.label(), node.payload.summary())
            .replace('"', "'");
        lines.push(format!("    n{}[\"{}\"]", idx.index(), label));
    }

    for edge in inner.edge_indices() {
        if let Some((a, b)) = inner.edge_endpoints(edge) {
            lines.push(format!(
                "    n{} -->|{}| n{}",
                a.index(),
                inner[edge],
                b.index()
            ));
        }
    }

    lines.join("\n")
}

fn color(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::ManifestRoot => "#e5e7eb",
        NodeKind::SecretDeclaration => "#f59e0b",
        NodeKind::ExternalSink { .. } => "#ef4444",
        NodeKind::Unresolved { .. } => "#a855f7",
        _ => "#93c5fd",
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeId, Payload, Relation};

    fn sample() -> TaintGraph {
        let mut g = TaintGraph::new("demo");
        for (id, kind) in [
            ("decl", NodeKind::SecretDeclaration),
            ("stmt", NodeKind::ScriptStatement),
        ] {
            g.add_node(Node {
                id: NodeId::from(id),
                kind,
                origin: None,
                payload: Payload::text("say \"hi\""),
            });
        }
        g.add_edge(&"decl".into(), &"stmt".into(), Relation::InjectsInto)
            .unwrap();
        g
    }

    #[test]
    fn dot_contains_nodes_and_labelled_edges() {
        let dot = to_dot(&sample());
        assert!(dot.starts_with("digraph \"demo\""));
        assert!(dot.contains("\"decl\" -> \"stmt\" [label=\"injects_into\"]"));
        assert!(dot.contains("say \\\"hi\\\""));
    }

    #[test]
    fn mermaid_uses_index_ids() {
        let mermaid = to_mermaid(&sample());
        assert!(mermaid.contains("n0 -->|injects_into| n1"));
        assert!(mermaid.contains("n1[\"script_statement: say 'hi'\"]"));
    }
}
