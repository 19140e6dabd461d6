//! Traced computation-graph node model (render-only view).
//!
//! Nodes are produced by an external tracing component; the renderer never
//! mutates them. Node order in a [`Graph`] is insertion order and is the
//! traversal order everywhere in this crate.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::meta::NodeMeta;

/// Maximum literal-sequence elements shown when formatting an argument.
pub const MAX_DISPLAYED_ELEMENTS: usize = 10;

/// Operator kind of a graph node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Graph input.
    Input,
    /// Invocation of a sub-module.
    CallModule,
    /// Fetch of a named parameter.
    GetParam,
    /// Fetch of an arbitrary attribute.
    GetAttr,
    /// Graph output.
    Output,
    /// Free-function call.
    CallFunction,
    /// Method call on a value.
    CallMethod,
}

impl OpKind {
    /// Wire name, matching the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            OpKind::Input => "input",
            OpKind::CallModule => "call_module",
            OpKind::GetParam => "get_param",
            OpKind::GetAttr => "get_attr",
            OpKind::Output => "output",
            OpKind::CallFunction => "call_function",
            OpKind::CallMethod => "call_method",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A positional or keyword argument recorded on a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Argument {
    /// Absent / null.
    None,
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    Str(String),
    /// Reference to another node's output, by node name.
    NodeRef(String),
    /// Ordered sequence of arguments.
    List(Vec<Argument>),
    /// Fixed-arity tuple of arguments.
    Tuple(Vec<Argument>),
}

/// Render an argument for a node label.
///
/// Node references render as `%name`; sequences are truncated to
/// [`MAX_DISPLAYED_ELEMENTS`] displayed elements followed by `...`.
pub fn format_arg(arg: &Argument) -> String {
    match arg {
        Argument::None => "none".to_string(),
        Argument::Bool(b) => b.to_string(),
        Argument::Int(i) => i.to_string(),
        Argument::Float(x) => x.to_string(),
        Argument::Str(s) => format!("'{s}'"),
        Argument::NodeRef(name) => format!("%{name}"),
        Argument::List(items) => format_seq(items, '[', ']'),
        Argument::Tuple(items) => format_seq(items, '(', ')'),
    }
}

fn format_seq(items: &[Argument], open: char, close: char) -> String {
    let shown: Vec<String> =
        items.iter().take(MAX_DISPLAYED_ELEMENTS).map(format_arg).collect();
    if items.len() > MAX_DISPLAYED_ELEMENTS {
        format!("{open}{}, ...{close}", shown.join(", "))
    } else {
        format!("{open}{}{close}", shown.join(", "))
    }
}

/// A single node of a traced graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node name within its graph.
    pub name: String,
    /// Operator kind.
    pub op: OpKind,
    /// Call target: a dotted module path for `call_module`/`get_attr`/
    /// `get_param`, a qualified name otherwise.
    pub target: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Argument>,
    /// Keyword arguments in declaration order.
    #[serde(default)]
    pub kwargs: Vec<(String, Argument)>,
    /// Names of nodes consuming this node's output.
    #[serde(default)]
    pub users: Vec<String>,
    /// Optional tensor metadata attached by shape propagation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<NodeMeta>,
}

impl Node {
    /// Create a node with no arguments, users, or metadata.
    pub fn new(name: impl Into<String>, op: OpKind, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op,
            target: target.into(),
            args: Vec::new(),
            kwargs: Vec::new(),
            users: Vec::new(),
            meta: None,
        }
    }

    /// Set positional arguments.
    pub fn with_args(mut self, args: Vec<Argument>) -> Self {
        self.args = args;
        self
    }

    /// Set keyword arguments.
    pub fn with_kwargs(mut self, kwargs: Vec<(String, Argument)>) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Set the consumer list.
    pub fn with_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users = users.into_iter().map(Into::into).collect();
        self
    }

    /// Attach tensor metadata.
    pub fn with_meta(mut self, meta: NodeMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// A traced graph: nodes in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Nodes in insertion order.
    pub nodes: Vec<Node>,
}

impl Graph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node.
    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
