//! Tensor metadata attached to graph nodes and its label rendering.
//!
//! Metadata arrives as an arbitrarily nested tree of tensor records,
//! sequences, maps, and tuples; flattening walks the tree in traversal
//! order and concatenates one label fragment per tensor record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, TrazarError};
use crate::quant::QuantScheme;

/// Element dtype of a traced tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit float.
    F32,
    /// 16-bit IEEE float.
    F16,
    /// 16-bit brain float.
    Bf16,
    /// 64-bit signed integer.
    I64,
    /// 32-bit signed integer.
    I32,
    /// 8-bit unsigned integer.
    U8,
    /// 8-bit signed integer.
    I8,
    /// Boolean.
    Bool,
    /// Quantized unsigned 8-bit.
    QUint8,
    /// Quantized signed 8-bit.
    QInt8,
}

impl DType {
    /// Wire name, matching the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F16 => "f16",
            DType::Bf16 => "bf16",
            DType::I64 => "i64",
            DType::I32 => "i32",
            DType::U8 => "u8",
            DType::I8 => "i8",
            DType::Bool => "bool",
            DType::QUint8 => "quint8",
            DType::QInt8 => "qint8",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Quantization descriptor carried on a traced tensor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetaQParams {
    /// Quantization scheme of the traced tensor.
    pub scheme: QuantScheme,
    /// Scale(s): one for per-tensor, one per channel otherwise.
    pub scales: Vec<f32>,
    /// Zero point(s), same cardinality as `scales`.
    pub zero_points: Vec<i32>,
    /// Channel axis for per-channel schemes.
    pub axis: usize,
}

/// Shape/dtype record attached by shape propagation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TensorMeta {
    /// Element dtype.
    pub dtype: DType,
    /// Tensor shape.
    pub shape: Vec<usize>,
    /// Whether the tensor tracks gradients.
    pub requires_grad: bool,
    /// Row-major strides.
    pub stride: Vec<usize>,
    /// Quantization descriptor, present only for quantized tensors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qparams: Option<MetaQParams>,
}

/// Metadata value attached to a node: a tensor record or a nested
/// container of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMeta {
    /// A single tensor record.
    Tensor(TensorMeta),
    /// Ordered sequence of metadata values.
    List(Vec<NodeMeta>),
    /// Keyed collection; rendered in key order.
    Map(BTreeMap<String, NodeMeta>),
    /// Fixed-arity tuple of metadata values.
    Tuple(Vec<NodeMeta>),
    /// A value the renderer does not understand; rendering it is an error.
    Opaque(String),
}

/// Flatten a metadata tree into one label fragment.
///
/// Containers recurse in traversal order; an [`NodeMeta::Opaque`] value
/// fails with `UnsupportedMeta`.
pub fn meta_label(meta: &NodeMeta) -> Result<String> {
    match meta {
        NodeMeta::Tensor(tm) => tensor_meta_label(tm),
        NodeMeta::List(items) | NodeMeta::Tuple(items) => {
            let mut out = String::new();
            for item in items {
                out.push_str(&meta_label(item)?);
            }
            Ok(out)
        }
        NodeMeta::Map(map) => {
            let mut out = String::new();
            for value in map.values() {
                out.push_str(&meta_label(value)?);
            }
            Ok(out)
        }
        NodeMeta::Opaque(found) => {
            Err(TrazarError::UnsupportedMeta { found: found.clone() })
        }
    }
}

fn tensor_meta_label(tm: &TensorMeta) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("|dtype={}\\n", tm.dtype));
    out.push_str(&format!("|shape={:?}\\n", tm.shape));
    out.push_str(&format!("|requires_grad={}\\n", tm.requires_grad));
    out.push_str(&format!("|stride={:?}\\n", tm.stride));
    if let Some(q) = &tm.qparams {
        match q.scheme {
            QuantScheme::PerTensorAffine => {
                out.push_str(&format!(
                    "|q_scale={}\\n",
                    q.scales.first().copied().unwrap_or(1.0)
                ));
                out.push_str(&format!(
                    "|q_zero_point={}\\n",
                    q.zero_points.first().copied().unwrap_or(0)
                ));
            }
            QuantScheme::PerChannelAffine | QuantScheme::PerChannelAffineFloatParams => {
                out.push_str(&format!("|q_per_channel_scale={:?}\\n", q.scales));
                out.push_str(&format!("|q_per_channel_zero_point={:?}\\n", q.zero_points));
                out.push_str(&format!("|q_per_channel_axis={}\\n", q.axis));
            }
            QuantScheme::None => {
                return Err(TrazarError::UnsupportedScheme {
                    scheme: QuantScheme::None,
                    op: "tensor metadata rendering",
                });
            }
        }
        out.push_str(&format!("|qscheme={}\\n", q.scheme));
    }
    Ok(out)
}
