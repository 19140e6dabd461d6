//! Weight quantization parameters
//!
//! Manages the quantization metadata attached to floating-point weights:
//! - Scheme/dtype dispatch for quantized and fake-quantized (quantize then
//!   dequantize) views of a weight
//! - Per-tensor and per-channel affine parameter records with validation
//! - Flat state-dict save/load so records round-trip through a persisted
//!   model state
//!
//! The actual storage of weights and the surrounding training loop live
//! elsewhere; this layer only owns the parameter records and the derived
//! views.

mod params;
mod quantize;
mod state;
mod types;
mod weight;

#[cfg(test)]
mod tests;

pub use params::WeightQuantParams;
pub use quantize::{fake_quantize_weight, quantize_weight, QuantizedRepr, QuantizedWeight};
pub use state::{
    load_weight_qparams, save_weight_qparams, weight_qparam_keys, StateDict, StateValue,
};
pub use types::{QuantDtype, QuantScheme};
pub use weight::WeightQuantizer;
