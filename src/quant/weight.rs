//! Quantized-weight manager: a weight tensor plus its quantization
//! parameters, with quantized and simulated views.

use super::quantize::{fake_quantize_weight, quantize_weight, QuantizedWeight};
use super::state::{parse_weight_qparams, save_weight_qparams, StateDict};
use super::WeightQuantParams;
use crate::error::Result;
use crate::tensor::Tensor;

/// Owns a floating-point weight and its quantization parameters.
///
/// The parameters are fixed at construction; the only way to replace them is
/// [`WeightQuantizer::load_state`], which overwrites the whole record
/// atomically from persisted state.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightQuantizer {
    weight: Tensor,
    params: WeightQuantParams,
}

impl WeightQuantizer {
    /// Attach parameters to a weight. `None` selects the default record
    /// (per-tensor affine, quint8, scale 1.0, zero point 0).
    pub fn new(weight: Tensor, params: Option<WeightQuantParams>) -> Result<Self> {
        let params = params.unwrap_or_default();
        params.validate(weight.shape())?;
        Ok(Self { weight, params })
    }

    /// The unmodified weight.
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// The attached quantization parameters.
    pub fn qparams(&self) -> &WeightQuantParams {
        &self.params
    }

    /// A quantized copy of the weight.
    pub fn quantized_weight(&self) -> Result<QuantizedWeight> {
        quantize_weight(&self.weight, &self.params)
    }

    /// The fake-quantized view: quantize-then-dequantize, reflecting the
    /// numeric error a quantized backend would introduce. Identity for
    /// scheme `none`.
    pub fn simulated_weight(&self) -> Result<Tensor> {
        fake_quantize_weight(&self.weight, &self.params)
    }

    /// Merge this weight's parameter record into a persisted state map.
    pub fn save_state(&self, dest: &mut StateDict, prefix: &str) {
        save_weight_qparams(dest, prefix, &self.params);
    }

    /// Replace the parameter record from persisted state.
    ///
    /// Parses and validates the full record first; on any failure neither
    /// this manager nor the source map is modified.
    pub fn load_state(&mut self, src: &mut StateDict, prefix: &str) -> Result<()> {
        let (params, keys) = parse_weight_qparams(src, prefix)?;
        params.validate(self.weight.shape())?;
        for key in &keys {
            src.remove(&format!("{prefix}{key}"));
        }
        self.params = params;
        Ok(())
    }
}
