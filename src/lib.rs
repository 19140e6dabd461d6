//! Computation-graph visualization and weight-quantization parameters.
//!
//! Two independent utility layers for a tracing/training stack:
//!
//! - [`graph`]: walks a traced module and emits one labeled Graphviz DOT
//!   graph per (sub)module — operator-colored nodes, record labels with
//!   arguments and tensor metadata, auxiliary weight nodes for leaf
//!   parameters and buffers.
//! - [`quant`]: attaches quantization parameters (scheme, target dtype,
//!   scales, zero points, channel axis) to a weight and derives quantized
//!   and fake-quantized views, with flat state-dict round-tripping.
//!
//! The two share nothing but the quantization vocabulary the renderer uses
//! for tensor metadata; neither calls the other.
//!
//! # Quantization example
//!
//! ```
//! use trazar::quant::{fake_quantize_weight, QuantDtype, WeightQuantParams};
//! use trazar::Tensor;
//!
//! let weight = Tensor::from_vec(vec![0.2, -0.4, 0.6], vec![3])?;
//! let params = WeightQuantParams::per_tensor(0.05, 128, QuantDtype::QUint8);
//!
//! // Simulated inference-time precision loss, still stored as f32.
//! let simulated = fake_quantize_weight(&weight, &params)?;
//! assert_eq!(simulated.len(), 3);
//! # Ok::<(), trazar::TrazarError>(())
//! ```
//!
//! # Rendering example
//!
//! ```
//! use trazar::graph::{Graph, GraphDrawer, GraphModule, Node, OpKind};
//!
//! let mut graph = Graph::new();
//! graph.push(Node::new("x", OpKind::Input, "x").with_users(["out"]));
//! graph.push(Node::new("out", OpKind::Output, "output"));
//! let module = GraphModule::new("Net", graph);
//!
//! let drawer = GraphDrawer::new(&module, "net", false)?;
//! let dot = drawer.main_graph().to_dot();
//! assert!(dot.starts_with("digraph"));
//! # Ok::<(), trazar::TrazarError>(())
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod tensor;

pub mod graph;
pub mod quant;

pub use error::{Result, TrazarError};
pub use tensor::Tensor;
