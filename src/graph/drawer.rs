//! Render a traced module as one DOT graph per (sub)module.
//!
//! Known operator kinds get fixed fill colors; anything else hashes its
//! target name into a fixed palette, so a given target keeps its color
//! within and across runs.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

use super::dot::{DotGraph, DotNode, NodeStyle};
use super::meta::meta_label;
use super::module::{GraphModule, LeafModule, Module};
use super::node::{format_arg, Node, OpKind};
use crate::error::Result;

const HASH_COLOR_MAP: [&str; 16] = [
    "CadetBlue1",
    "Coral",
    "DarkOliveGreen1",
    "DarkSeaGreen1",
    "GhostWhite",
    "Khaki1",
    "LavenderBlush1",
    "LightSkyBlue",
    "MistyRose1",
    "MistyRose2",
    "PaleTurquoise2",
    "PeachPuff1",
    "Salmon",
    "Thistle1",
    "Thistle3",
    "Wheat1",
];

fn fixed_color(op: OpKind) -> Option<&'static str> {
    match op {
        OpKind::Input => Some("AliceBlue"),
        OpKind::CallModule => Some("LemonChiffon1"),
        OpKind::GetParam => Some("Yellow2"),
        OpKind::GetAttr => Some("LightGrey"),
        OpKind::Output => Some("PowderBlue"),
        OpKind::CallFunction | OpKind::CallMethod => None,
    }
}

/// Deterministic palette color for an operator outside the fixed table.
fn hashed_color(target: &str) -> &'static str {
    let digest = Sha256::digest(target.as_bytes());
    let idx = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize;
    HASH_COLOR_MAP[idx % HASH_COLOR_MAP.len()]
}

fn node_style(node: &Node) -> NodeStyle {
    let fillcolor = match fixed_color(node.op) {
        Some(color) => color,
        None => hashed_color(&node.target),
    };
    NodeStyle { fillcolor: fillcolor.to_string(), ..NodeStyle::default() }
}

fn weight_style() -> NodeStyle {
    NodeStyle { fillcolor: "Salmon".to_string(), ..NodeStyle::default() }
}

/// Renders a traced module and its directly invoked traced sub-modules,
/// one DOT graph each.
///
/// The root renders under `name`; a sub-module invoked by a `call_module`
/// node renders under `{name}_{target}`.
#[derive(Clone, Debug)]
pub struct GraphDrawer {
    name: String,
    graphs: BTreeMap<String, DotGraph>,
}

impl GraphDrawer {
    /// Render `root` and every traced sub-module its graph invokes.
    ///
    /// With `ignore_get_attr` set, attribute-fetch nodes and their incident
    /// edges are left out of every rendered graph.
    pub fn new(root: &GraphModule, name: &str, ignore_get_attr: bool) -> Result<Self> {
        let mut graphs = BTreeMap::new();
        graphs.insert(name.to_string(), render_module(root, name, ignore_get_attr)?);

        for node in &root.graph.nodes {
            if node.op != OpKind::CallModule {
                continue;
            }
            if let Module::Graph(sub) = root.resolve(&node.target)? {
                let sub_name = format!("{name}_{}", node.target);
                let rendered = render_module(sub, &sub_name, ignore_get_attr)?;
                graphs.insert(sub_name, rendered);
            }
        }

        Ok(Self { name: name.to_string(), graphs })
    }

    /// The root module's graph.
    pub fn main_graph(&self) -> &DotGraph {
        self.graphs
            .get(&self.name)
            .expect("root graph is rendered at construction")
    }

    /// A sub-module's graph by its invocation target.
    pub fn submodule_graph(&self, target: &str) -> Option<&DotGraph> {
        self.graphs.get(&format!("{}_{target}", self.name))
    }

    /// Every rendered graph, keyed by name.
    pub fn all_graphs(&self) -> &BTreeMap<String, DotGraph> {
        &self.graphs
    }
}

fn render_module(module: &GraphModule, name: &str, ignore_get_attr: bool) -> Result<DotGraph> {
    let mut dot = DotGraph::new(name);

    let ignored: BTreeSet<&str> = if ignore_get_attr {
        module
            .graph
            .nodes
            .iter()
            .filter(|n| n.op == OpKind::GetAttr)
            .map(|n| n.name.as_str())
            .collect()
    } else {
        BTreeSet::new()
    };

    for node in &module.graph.nodes {
        if ignored.contains(node.name.as_str()) {
            continue;
        }

        let label = node_label(module, node)?;
        dot.add_node(DotNode { id: node.name.clone(), label, style: node_style(node) });

        if node.op == OpKind::CallModule {
            if let Module::Leaf(leaf) = module.resolve(&node.target)? {
                add_leaf_slots(&mut dot, node, leaf);
            }
        }
    }

    for node in &module.graph.nodes {
        if ignored.contains(node.name.as_str()) {
            continue;
        }
        for user in &node.users {
            if ignored.contains(user.as_str()) {
                continue;
            }
            dot.add_edge(node.name.clone(), user.clone());
        }
    }

    Ok(dot)
}

fn node_label(module: &GraphModule, node: &Node) -> Result<String> {
    let mut label = format!("{{name=%{}|op_code={}\\n", node.name, node.op);

    if node.op == OpKind::CallModule {
        let target = module.resolve(&node.target)?;
        label.push_str(&format!("\\n{}\\n|", target.type_name()));
        if let Module::Leaf(leaf) = target {
            let constants: Vec<String> =
                leaf.constants.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            label.push_str(&constants.join("\\n"));
        }
        label.push_str("\\n");
    } else {
        label.push_str(&format!("|target={}\\n", node.target));
        if !node.args.is_empty() {
            let args: Vec<String> = node.args.iter().map(format_arg).collect();
            label.push_str(&format!("|args=({})\\l", args.join(", ")));
        }
        if !node.kwargs.is_empty() {
            let kwargs: Vec<String> =
                node.kwargs.iter().map(|(k, v)| format!("{k}: {}", format_arg(v))).collect();
            label.push_str(&format!("|kwargs=({})\\l", kwargs.join(", ")));
        }
        label.push_str(&format!("|num_users={}\\n", node.users.len()));
    }

    if let Some(meta) = &node.meta {
        label.push_str(&meta_label(meta)?);
    }

    label.push('}');
    Ok(label)
}

/// One auxiliary node per parameter/buffer of an invoked leaf module, with
/// an edge into the invoking node.
fn add_leaf_slots(dot: &mut DotGraph, node: &Node, leaf: &LeafModule) {
    let slots = leaf
        .parameters
        .iter()
        .map(|s| (s, "parameter"))
        .chain(leaf.buffers.iter().map(|s| (s, "buffer")));

    for (slot, kind) in slots {
        let id = format!("{}.{}", node.name, slot.name);
        let label =
            format!("{{{id}|op_code=get_{kind}\\l{}{:?}\\n}}", slot.dtype, slot.shape);
        dot.add_node(DotNode { id: id.clone(), label, style: weight_style() });
        dot.add_edge(id, node.name.clone());
    }
}
