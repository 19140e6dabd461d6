//! Quantize / dequantize dispatch over weight quantization schemes.
//!
//! The affine mapping is `q = clamp(round(x / scale) + zero_point, qmin, qmax)`
//! with the exact inverse `x = (q - zero_point) * scale`. Per-channel schemes
//! apply one (scale, zero_point) pair per slice along the configured axis;
//! the fp16 target is a plain element cast.

use half::f16;
use ndarray::Array1;

use super::{QuantDtype, QuantScheme, WeightQuantParams};
use crate::error::{Result, TrazarError};
use crate::tensor::Tensor;

/// Stored codes of a quantized weight.
#[derive(Clone, Debug, PartialEq)]
pub enum QuantizedRepr {
    /// Unsigned 8-bit affine codes.
    QUint8(Vec<u8>),
    /// Signed 8-bit affine codes.
    QInt8(Vec<i8>),
    /// Half-precision floats from the cast path.
    Fp16(Vec<f16>),
}

impl QuantizedRepr {
    /// Number of stored elements.
    pub fn len(&self) -> usize {
        match self {
            QuantizedRepr::QUint8(v) => v.len(),
            QuantizedRepr::QInt8(v) => v.len(),
            QuantizedRepr::Fp16(v) => v.len(),
        }
    }

    /// Whether no elements are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A quantized copy of a weight, carrying the parameters that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizedWeight {
    repr: QuantizedRepr,
    params: WeightQuantParams,
    shape: Vec<usize>,
}

impl QuantizedWeight {
    /// Stored low-precision codes.
    pub fn repr(&self) -> &QuantizedRepr {
        &self.repr
    }

    /// Parameters the weight was quantized with.
    pub fn qparams(&self) -> &WeightQuantParams {
        &self.params
    }

    /// Shape of the original weight.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Memory used by codes plus quantization parameters, in bytes.
    pub fn memory_bytes(&self) -> usize {
        let code_bytes = self.repr.len() * self.params.dtype.size_bytes();
        let scale_bytes = self.params.scales.len() * 4;
        let zp_bytes = self.params.zero_points.len() * 4;
        code_bytes + scale_bytes + zp_bytes
    }

    /// Map the stored codes back to floating point.
    ///
    /// Exact inverse arithmetic of [`quantize_weight`]: the result equals the
    /// fake-quantized view of the original weight.
    pub fn dequantize(&self) -> Tensor {
        let values: Vec<f32> = match &self.repr {
            QuantizedRepr::QUint8(codes) => {
                self.dequantize_codes(codes.iter().map(|&q| i32::from(q)))
            }
            QuantizedRepr::QInt8(codes) => {
                self.dequantize_codes(codes.iter().map(|&q| i32::from(q)))
            }
            QuantizedRepr::Fp16(halves) => halves.iter().map(|h| h.to_f32()).collect(),
        };
        Tensor::from_parts(Array1::from(values), self.shape.clone(), false)
    }

    fn dequantize_codes(&self, codes: impl Iterator<Item = i32>) -> Vec<f32> {
        let per_channel = self.params.scheme.is_per_channel();
        codes
            .enumerate()
            .map(|(i, q)| {
                let ch = if per_channel {
                    channel_index(i, &self.shape, self.params.axis)
                } else {
                    0
                };
                (q - self.params.zero_points[ch]) as f32 * self.params.scales[ch]
            })
            .collect()
    }
}

/// Quantize a weight according to its parameters.
///
/// Dispatches on `params.scheme`:
/// - per-tensor affine: quint8/qint8 use the affine mapping; fp16 is a cast;
/// - per-channel schemes: quint8/qint8 along `params.axis`;
/// - everything else is rejected with `UnsupportedScheme`/`UnsupportedDtype`.
///
/// Pure: the input weight is never mutated.
pub fn quantize_weight(weight: &Tensor, params: &WeightQuantParams) -> Result<QuantizedWeight> {
    params.validate(weight.shape())?;

    let repr = match params.scheme {
        QuantScheme::PerTensorAffine => match params.dtype {
            QuantDtype::QUint8 | QuantDtype::QInt8 => affine_repr(weight, params),
            QuantDtype::Fp16 => QuantizedRepr::Fp16(
                weight.data().iter().map(|&x| f16::from_f32(x)).collect(),
            ),
            dtype => {
                return Err(TrazarError::UnsupportedDtype { dtype, scheme: params.scheme });
            }
        },
        QuantScheme::PerChannelAffine | QuantScheme::PerChannelAffineFloatParams => {
            match params.dtype {
                QuantDtype::QUint8 | QuantDtype::QInt8 => affine_repr(weight, params),
                dtype => {
                    return Err(TrazarError::UnsupportedDtype { dtype, scheme: params.scheme });
                }
            }
        }
        QuantScheme::None => {
            return Err(TrazarError::UnsupportedScheme {
                scheme: QuantScheme::None,
                op: "quantize",
            });
        }
    };

    Ok(QuantizedWeight { repr, params: params.clone(), shape: weight.shape().to_vec() })
}

/// Quantize then immediately dequantize, simulating inference-time precision
/// loss while keeping float storage.
///
/// With scheme `None` the weight passes through unchanged.
pub fn fake_quantize_weight(weight: &Tensor, params: &WeightQuantParams) -> Result<Tensor> {
    if params.scheme == QuantScheme::None {
        return Ok(weight.clone());
    }
    Ok(quantize_weight(weight, params)?.dequantize())
}

/// Affine integer codes for a weight; the caller guarantees an int8 dtype
/// and validated parameters.
fn affine_repr(weight: &Tensor, params: &WeightQuantParams) -> QuantizedRepr {
    let (qmin, qmax) = params.dtype.int_range().unwrap_or((0, 255));
    let codes = affine_codes(weight, params, qmin, qmax);
    if params.dtype == QuantDtype::QInt8 {
        QuantizedRepr::QInt8(codes.into_iter().map(|q| q as i8).collect())
    } else {
        QuantizedRepr::QUint8(codes.into_iter().map(|q| q as u8).collect())
    }
}

fn affine_codes(weight: &Tensor, params: &WeightQuantParams, qmin: i32, qmax: i32) -> Vec<i32> {
    let shape = weight.shape();
    let per_channel = params.scheme.is_per_channel();
    weight
        .data()
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let ch = if per_channel { channel_index(i, shape, params.axis) } else { 0 };
            let scale = params.scales[ch];
            let zp = params.zero_points[ch];
            ((x / scale).round() as i32).saturating_add(zp).clamp(qmin, qmax)
        })
        .collect()
}

/// Channel index of flat element `i` along `axis` in a row-major layout.
fn channel_index(i: usize, shape: &[usize], axis: usize) -> usize {
    let inner: usize = shape[axis + 1..].iter().product();
    (i / inner) % shape[axis]
}
