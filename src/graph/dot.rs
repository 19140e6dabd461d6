//! Minimal DOT (Graphviz) document model with deterministic emission.
//!
//! Nodes and edges render in insertion order, so two renders of the same
//! input produce byte-identical text. No file I/O happens here; the caller
//! feeds the text to whatever renders it.

use serde::{Deserialize, Serialize};

/// Visual attributes of a DOT node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    /// Node shape.
    pub shape: String,
    /// Fill color name or hex value.
    pub fillcolor: String,
    /// Style flags, e.g. `filled,rounded`.
    pub style: String,
    /// Text color.
    pub fontcolor: String,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            shape: "record".to_string(),
            fillcolor: "#CAFFE3".to_string(),
            style: "filled,rounded".to_string(),
            fontcolor: "#000000".to_string(),
        }
    }
}

/// A labeled, styled DOT node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DotNode {
    /// Node identifier, unique within its graph.
    pub id: String,
    /// Record label; may contain DOT `\n`/`\l` escapes.
    pub label: String,
    /// Visual attributes.
    pub style: NodeStyle,
}

/// A directed edge between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DotEdge {
    /// Source node id.
    pub from: String,
    /// Destination node id.
    pub to: String,
}

/// A directed graph ready for DOT emission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DotGraph {
    /// Graph name.
    pub name: String,
    /// Rank direction, `TB` by default.
    pub rank_dir: String,
    nodes: Vec<DotNode>,
    edges: Vec<DotEdge>,
}

impl DotGraph {
    /// Empty graph with top-to-bottom ranking.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rank_dir: "TB".to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Append a node.
    pub fn add_node(&mut self, node: DotNode) {
        self.nodes.push(node);
    }

    /// Append a directed edge.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.edges.push(DotEdge { from: from.into(), to: to.into() });
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[DotNode] {
        &self.nodes
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[DotEdge] {
        &self.edges
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&DotNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Emit the graph as DOT text.
    pub fn to_dot(&self) -> String {
        let mut dot = format!("digraph \"{}\" {{\n", escape(&self.name));
        dot.push_str(&format!("  rankdir={};\n", self.rank_dir));

        for node in &self.nodes {
            dot.push_str(&format!(
                "  \"{}\" [label=\"{}\", shape={}, fillcolor=\"{}\", style=\"{}\", fontcolor=\"{}\"];\n",
                escape(&node.id),
                escape(&node.label),
                node.style.shape,
                node.style.fillcolor,
                node.style.style,
                node.style.fontcolor,
            ));
        }
        for edge in &self.edges {
            dot.push_str(&format!("  \"{}\" -> \"{}\";\n", escape(&edge.from), escape(&edge.to)));
        }

        dot.push_str("}\n");
        dot
    }
}

/// Escape double quotes for a quoted DOT string.
fn escape(text: &str) -> String {
    text.replace('"', "\\\"")
}
