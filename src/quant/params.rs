//! Weight quantization parameters

use serde::{Deserialize, Serialize};

use super::{QuantDtype, QuantScheme};
use crate::error::{Result, TrazarError};

/// Quantization parameters attached to a single weight tensor.
///
/// Constructed once when the owning module is initialized and immutable
/// afterwards, except through a state-dict load which replaces the whole
/// record at once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightQuantParams {
    /// Quantization scheme.
    pub scheme: QuantScheme,
    /// Target low-precision representation.
    pub dtype: QuantDtype,
    /// Scale factor(s): one entry for per-tensor schemes, one per channel
    /// for per-channel schemes.
    pub scales: Vec<f32>,
    /// Zero point(s), same cardinality as `scales`.
    pub zero_points: Vec<i32>,
    /// Channel axis for per-channel schemes. Ignored by per-tensor schemes
    /// but always present so every record serializes the same way.
    pub axis: usize,
}

impl Default for WeightQuantParams {
    /// The framework-wide fallback: per-tensor affine, quint8, scale 1.0,
    /// zero point 0.
    fn default() -> Self {
        Self::per_tensor(1.0, 0, QuantDtype::QUint8)
    }
}

impl WeightQuantParams {
    /// Parameters for an unquantized weight.
    pub fn none() -> Self {
        Self {
            scheme: QuantScheme::None,
            dtype: QuantDtype::QUint8,
            scales: Vec::new(),
            zero_points: Vec::new(),
            axis: 0,
        }
    }

    /// Per-tensor affine parameters with a single scale/zero-point pair.
    pub fn per_tensor(scale: f32, zero_point: i32, dtype: QuantDtype) -> Self {
        Self {
            scheme: QuantScheme::PerTensorAffine,
            dtype,
            scales: vec![scale],
            zero_points: vec![zero_point],
            axis: 0,
        }
    }

    /// Per-channel parameters along `axis`.
    ///
    /// `scheme` must be one of the per-channel variants.
    pub fn per_channel(
        scheme: QuantScheme,
        scales: Vec<f32>,
        zero_points: Vec<i32>,
        axis: usize,
        dtype: QuantDtype,
    ) -> Result<Self> {
        if !scheme.is_per_channel() {
            return Err(TrazarError::UnsupportedScheme { scheme, op: "per-channel parameters" });
        }
        Ok(Self { scheme, dtype, scales, zero_points, axis })
    }

    /// Number of scale/zero-point pairs.
    pub fn num_channels(&self) -> usize {
        self.scales.len()
    }

    /// Check the parameter record against a weight shape.
    ///
    /// Per-tensor schemes need exactly one scale/zero-point pair;
    /// per-channel schemes need one pair per slice along `axis`. Runs before
    /// any tensor math so mismatches never reach the arithmetic.
    pub fn validate(&self, shape: &[usize]) -> Result<()> {
        match self.scheme {
            QuantScheme::None => Ok(()),
            QuantScheme::PerTensorAffine => {
                if self.scales.len() != 1 || self.zero_points.len() != 1 {
                    return Err(TrazarError::QParamLengthMismatch {
                        axis: self.axis,
                        expected: 1,
                        scales: self.scales.len(),
                        zero_points: self.zero_points.len(),
                    });
                }
                Ok(())
            }
            QuantScheme::PerChannelAffine | QuantScheme::PerChannelAffineFloatParams => {
                if self.axis >= shape.len() {
                    return Err(TrazarError::AxisOutOfRange {
                        axis: self.axis,
                        ndim: shape.len(),
                    });
                }
                let expected = shape[self.axis];
                if self.scales.len() != expected || self.zero_points.len() != expected {
                    return Err(TrazarError::QParamLengthMismatch {
                        axis: self.axis,
                        expected,
                        scales: self.scales.len(),
                        zero_points: self.zero_points.len(),
                    });
                }
                Ok(())
            }
        }
    }
}
