//! Module tree resolved against graph node targets.
//!
//! The tree is an explicit recursive structure with named children; target
//! resolution is a plain map walk over the dotted path, no reflection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::meta::DType;
use super::node::Graph;
use crate::error::{Result, TrazarError};

/// A node of the module tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    /// A traced module with its own graph and children.
    Graph(GraphModule),
    /// An opaque leaf: parameters and buffers only.
    Leaf(LeafModule),
}

impl Module {
    /// Type name of the underlying module.
    pub fn type_name(&self) -> &str {
        match self {
            Module::Graph(m) => &m.type_name,
            Module::Leaf(m) => &m.type_name,
        }
    }

    /// Whether this module exposes a traced graph.
    pub fn is_graph(&self) -> bool {
        matches!(self, Module::Graph(_))
    }
}

/// A traced module: a graph over named children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphModule {
    /// Type name shown in labels.
    pub type_name: String,
    /// The traced graph.
    pub graph: Graph,
    /// Named child modules.
    #[serde(default)]
    pub children: BTreeMap<String, Module>,
}

impl GraphModule {
    /// Create a traced module with no children.
    pub fn new(type_name: impl Into<String>, graph: Graph) -> Self {
        Self { type_name: type_name.into(), graph, children: BTreeMap::new() }
    }

    /// Add a named child, builder style.
    pub fn with_child(mut self, name: impl Into<String>, child: Module) -> Self {
        self.children.insert(name.into(), child);
        self
    }

    /// Resolve a dotted target path against the child tree.
    ///
    /// Fails with `UnresolvedTarget` naming the first atom that does not
    /// exist (or descends into a leaf).
    pub fn resolve(&self, path: &str) -> Result<&Module> {
        let unresolved = |atom: &str| TrazarError::UnresolvedTarget {
            path: path.to_string(),
            atom: atom.to_string(),
        };

        let mut atoms = path.split('.');
        let first = atoms.next().unwrap_or_default();
        let mut module = self.children.get(first).ok_or_else(|| unresolved(first))?;
        for atom in atoms {
            let Module::Graph(parent) = module else {
                return Err(unresolved(atom));
            };
            module = parent.children.get(atom).ok_or_else(|| unresolved(atom))?;
        }
        Ok(module)
    }
}

/// An opaque module: internals are parameters and buffers only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeafModule {
    /// Type name shown in labels.
    pub type_name: String,
    /// Declared constant attributes, as (name, rendered value) pairs.
    #[serde(default)]
    pub constants: Vec<(String, String)>,
    /// Owned parameters.
    #[serde(default)]
    pub parameters: Vec<TensorSlot>,
    /// Owned buffers.
    #[serde(default)]
    pub buffers: Vec<TensorSlot>,
}

impl LeafModule {
    /// Create a leaf with no constants, parameters, or buffers.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            constants: Vec::new(),
            parameters: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// Add a declared constant, builder style.
    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.constants.push((name.into(), value.into()));
        self
    }

    /// Add a parameter slot, builder style.
    pub fn with_parameter(mut self, slot: TensorSlot) -> Self {
        self.parameters.push(slot);
        self
    }

    /// Add a buffer slot, builder style.
    pub fn with_buffer(mut self, slot: TensorSlot) -> Self {
        self.buffers.push(slot);
        self
    }
}

/// Dtype and shape of a parameter or buffer owned by a leaf module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TensorSlot {
    /// Slot name within its module.
    pub name: String,
    /// Element dtype.
    pub dtype: DType,
    /// Tensor shape.
    pub shape: Vec<usize>,
}

impl TensorSlot {
    /// Create a slot.
    pub fn new(name: impl Into<String>, dtype: DType, shape: Vec<usize>) -> Self {
        Self { name: name.into(), dtype, shape }
    }
}
