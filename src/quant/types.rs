//! Quantization scheme and target dtype definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quantization scheme attached to a weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuantScheme {
    /// Not quantized; quantization parameters carry no meaning.
    None,
    /// Single scale/zero-point pair for the entire tensor.
    #[default]
    PerTensorAffine,
    /// Independent scale/zero-point pair per slice along a chosen axis.
    PerChannelAffine,
    /// Per-channel affine with float-precision parameters in the backend.
    PerChannelAffineFloatParams,
}

impl QuantScheme {
    /// Wire name, matching the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            QuantScheme::None => "none",
            QuantScheme::PerTensorAffine => "per_tensor_affine",
            QuantScheme::PerChannelAffine => "per_channel_affine",
            QuantScheme::PerChannelAffineFloatParams => "per_channel_affine_float_params",
        }
    }

    /// Whether the scheme carries one parameter pair per channel.
    pub fn is_per_channel(self) -> bool {
        matches!(
            self,
            QuantScheme::PerChannelAffine | QuantScheme::PerChannelAffineFloatParams
        )
    }

    /// Whether the scheme quantizes at all.
    pub fn is_quantized(self) -> bool {
        self != QuantScheme::None
    }
}

impl fmt::Display for QuantScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Low-precision target representation for a quantized weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuantDtype {
    /// Unsigned 8-bit integer codes, range [0, 255].
    #[default]
    QUint8,
    /// Signed 8-bit integer codes, range [-128, 127].
    QInt8,
    /// IEEE half-precision float; a cast, not an affine mapping.
    Fp16,
    /// Brain float 16; carried for serialization but not quantizable here.
    Bf16,
}

impl QuantDtype {
    /// Wire name, matching the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            QuantDtype::QUint8 => "quint8",
            QuantDtype::QInt8 => "qint8",
            QuantDtype::Fp16 => "fp16",
            QuantDtype::Bf16 => "bf16",
        }
    }

    /// Whether this dtype stores 8-bit integer codes.
    pub fn is_int8(self) -> bool {
        matches!(self, QuantDtype::QUint8 | QuantDtype::QInt8)
    }

    /// Inclusive integer code range, if this is an integer dtype.
    pub fn int_range(self) -> Option<(i32, i32)> {
        match self {
            QuantDtype::QUint8 => Some((0, 255)),
            QuantDtype::QInt8 => Some((-128, 127)),
            QuantDtype::Fp16 | QuantDtype::Bf16 => None,
        }
    }

    /// Storage size per element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            QuantDtype::QUint8 | QuantDtype::QInt8 => 1,
            QuantDtype::Fp16 | QuantDtype::Bf16 => 2,
        }
    }
}

impl fmt::Display for QuantDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
