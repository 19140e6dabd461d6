//! Computation-graph visualization
//!
//! Walks a traced module and produces one labeled directed graph per
//! (sub)module, ready for an external DOT renderer:
//! - Fixed fill colors for known operator kinds, stable hashed colors for
//!   the rest
//! - Multi-line record labels with targets, arguments, consumer counts, and
//!   flattened tensor metadata (including quantization descriptors)
//! - Auxiliary weight nodes for parameters/buffers of invoked leaf modules
//!
//! The graph and module tree are read-only inputs supplied by an external
//! tracing component.

mod dot;
mod drawer;
mod meta;
mod module;
mod node;


pub use dot::{DotEdge, DotGraph, DotNode, NodeStyle};
pub use drawer::GraphDrawer;
pub use meta::{meta_label, DType, MetaQParams, NodeMeta, TensorMeta};
pub use module::{GraphModule, LeafModule, Module, TensorSlot};
pub use node::{format_arg, Argument, Graph, Node, OpKind, MAX_DISPLAYED_ELEMENTS};
