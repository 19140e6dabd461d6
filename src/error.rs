//! Error types for graph rendering and weight quantization.
//!
//! All errors are fatal to the operation that raised them; nothing in this
//! crate retries or recovers. Errors carry enough context to identify the
//! offending scheme, key, or target path without a debugger.

use thiserror::Error;

use crate::quant::{QuantDtype, QuantScheme};

/// Result type alias for trazar operations.
pub type Result<T> = std::result::Result<T, TrazarError>;

/// Errors raised by the graph drawer and the quantization-parameter layer.
#[derive(Debug, Error)]
pub enum TrazarError {
    /// The quantization scheme is not usable for the requested operation.
    #[error("unsupported qscheme {scheme} for {op}")]
    UnsupportedScheme {
        /// Scheme that was rejected.
        scheme: QuantScheme,
        /// Operation that rejected it.
        op: &'static str,
    },

    /// The target dtype is not usable under the given scheme.
    #[error("unsupported dtype {dtype} for qscheme {scheme}")]
    UnsupportedDtype {
        /// Dtype that was rejected.
        dtype: QuantDtype,
        /// Scheme it was combined with.
        scheme: QuantScheme,
    },

    /// Scale/zero-point cardinality does not match the weight extent.
    #[error(
        "quantization parameter length mismatch along axis {axis}: \
         expected {expected}, got {scales} scale(s) and {zero_points} zero-point(s)"
    )]
    QParamLengthMismatch {
        /// Channel axis the check ran against.
        axis: usize,
        /// Required number of scale/zero-point entries.
        expected: usize,
        /// Number of scales supplied.
        scales: usize,
        /// Number of zero-points supplied.
        zero_points: usize,
    },

    /// Per-channel axis does not exist on the weight.
    #[error("channel axis {axis} out of range for a {ndim}-dimensional weight")]
    AxisOutOfRange {
        /// Requested axis.
        axis: usize,
        /// Number of dimensions the weight actually has.
        ndim: usize,
    },

    /// Flat data length does not match the declared shape.
    #[error("tensor shape mismatch: shape {shape:?} holds {expected} elements, data has {actual}")]
    ShapeMismatch {
        /// Declared shape.
        shape: Vec<usize>,
        /// Element count the shape implies.
        expected: usize,
        /// Element count actually supplied.
        actual: usize,
    },

    /// Persisted state is missing a required entry, or the entry has the
    /// wrong kind of value.
    #[error("malformed persisted state: missing or invalid entry '{key}'\n  → re-save the checkpoint or check the key prefix")]
    MissingState {
        /// Fully prefixed key that failed to load.
        key: String,
    },

    /// A graph node references a module path that does not exist.
    #[error("module tree has no child '{atom}' while resolving '{path}'")]
    UnresolvedTarget {
        /// Full dotted path being resolved.
        path: String,
        /// Atom at which resolution failed.
        atom: String,
    },

    /// Attached tensor metadata is not a renderable value.
    #[error("unsupported tensor metadata: {found}")]
    UnsupportedMeta {
        /// Description of the value that could not be rendered.
        found: String,
    },
}
