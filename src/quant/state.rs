//! State-dict fragment for weight quantization parameters.
//!
//! A parameter record serializes into a flat key/value map under a caller
//! prefix, so several weights can share one persisted model state:
//!
//! ```text
//! {prefix}weight_qscheme      always
//! {prefix}weight_dtype        always
//! {prefix}weight_scale        scheme != none
//! {prefix}weight_zero_point   scheme != none
//! {prefix}weight_axis         per-channel schemes
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{QuantDtype, QuantScheme, WeightQuantParams};
use crate::error::{Result, TrazarError};

const SCHEME_KEY: &str = "weight_qscheme";
const DTYPE_KEY: &str = "weight_dtype";
const SCALE_KEY: &str = "weight_scale";
const ZERO_POINT_KEY: &str = "weight_zero_point";
const AXIS_KEY: &str = "weight_axis";

/// Flat persisted-state map the quantization fragment merges into.
pub type StateDict = BTreeMap<String, StateValue>;

/// A typed value in the persisted state map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateValue {
    /// A quantization scheme tag.
    Scheme(QuantScheme),
    /// A target dtype tag.
    Dtype(QuantDtype),
    /// Scale sequence (length 1 for per-tensor schemes).
    F32List(Vec<f32>),
    /// Zero-point sequence (length 1 for per-tensor schemes).
    I32List(Vec<i32>),
    /// Channel axis.
    USize(usize),
}

/// Write a parameter record into `dest` under `prefix`.
///
/// Scheme and dtype are always written; scale and zero-point only for
/// quantized schemes; the axis for both per-channel schemes, keeping save
/// and load symmetric per scheme.
pub fn save_weight_qparams(dest: &mut StateDict, prefix: &str, params: &WeightQuantParams) {
    dest.insert(format!("{prefix}{SCHEME_KEY}"), StateValue::Scheme(params.scheme));
    dest.insert(format!("{prefix}{DTYPE_KEY}"), StateValue::Dtype(params.dtype));
    if params.scheme.is_quantized() {
        dest.insert(format!("{prefix}{SCALE_KEY}"), StateValue::F32List(params.scales.clone()));
        dest.insert(
            format!("{prefix}{ZERO_POINT_KEY}"),
            StateValue::I32List(params.zero_points.clone()),
        );
        if params.scheme.is_per_channel() {
            dest.insert(format!("{prefix}{AXIS_KEY}"), StateValue::USize(params.axis));
        }
    }
}

/// The unprefixed keys a load from `src` would consume, determined by the
/// persisted scheme.
///
/// Fails with `MissingState` when a required entry is absent or holds the
/// wrong kind of value.
pub fn weight_qparam_keys(src: &StateDict, prefix: &str) -> Result<Vec<String>> {
    parse_weight_qparams(src, prefix).map(|(_, keys)| keys)
}

/// Reconstruct a parameter record from `src`, removing exactly the consumed
/// keys.
///
/// The map is only mutated after every field has parsed, so a malformed
/// record leaves `src` untouched.
pub fn load_weight_qparams(src: &mut StateDict, prefix: &str) -> Result<WeightQuantParams> {
    let (params, keys) = parse_weight_qparams(src, prefix)?;
    for key in &keys {
        src.remove(&format!("{prefix}{key}"));
    }
    Ok(params)
}

/// Parse a full record without mutating the source map. Returns the record
/// and the unprefixed keys it occupies.
pub(crate) fn parse_weight_qparams(
    src: &StateDict,
    prefix: &str,
) -> Result<(WeightQuantParams, Vec<String>)> {
    let scheme = match lookup(src, prefix, SCHEME_KEY)? {
        StateValue::Scheme(s) => *s,
        _ => return Err(malformed(prefix, SCHEME_KEY)),
    };
    let dtype = match lookup(src, prefix, DTYPE_KEY)? {
        StateValue::Dtype(d) => *d,
        _ => return Err(malformed(prefix, DTYPE_KEY)),
    };

    let mut keys = vec![SCHEME_KEY.to_string(), DTYPE_KEY.to_string()];
    let mut params = WeightQuantParams {
        scheme,
        dtype,
        scales: Vec::new(),
        zero_points: Vec::new(),
        axis: 0,
    };

    if scheme.is_quantized() {
        params.scales = match lookup(src, prefix, SCALE_KEY)? {
            StateValue::F32List(v) => v.clone(),
            _ => return Err(malformed(prefix, SCALE_KEY)),
        };
        params.zero_points = match lookup(src, prefix, ZERO_POINT_KEY)? {
            StateValue::I32List(v) => v.clone(),
            _ => return Err(malformed(prefix, ZERO_POINT_KEY)),
        };
        keys.push(SCALE_KEY.to_string());
        keys.push(ZERO_POINT_KEY.to_string());

        if scheme.is_per_channel() {
            params.axis = match lookup(src, prefix, AXIS_KEY)? {
                StateValue::USize(a) => *a,
                _ => return Err(malformed(prefix, AXIS_KEY)),
            };
            keys.push(AXIS_KEY.to_string());
        }
    }

    Ok((params, keys))
}

fn lookup<'a>(src: &'a StateDict, prefix: &str, key: &str) -> Result<&'a StateValue> {
    let full = format!("{prefix}{key}");
    src.get(&full).ok_or(TrazarError::MissingState { key: full })
}

fn malformed(prefix: &str, key: &str) -> TrazarError {
    TrazarError::MissingState { key: format!("{prefix}{key}") }
}
