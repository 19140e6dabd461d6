//! Flat tensor storage for weights handed to the quantizer.
//!
//! Data is kept as a flat `ndarray::Array1<f32>` in row-major order with the
//! logical shape carried separately, so per-channel operations can index any
//! axis with plain stride arithmetic.

use ndarray::Array1;

use crate::error::{Result, TrazarError};

/// A floating-point weight tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    data: Array1<f32>,
    shape: Vec<usize>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a tensor from flat data and a shape.
    ///
    /// Fails with `ShapeMismatch` if the shape does not account for every
    /// element of `data`.
    pub fn new(data: Array1<f32>, shape: Vec<usize>, requires_grad: bool) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TrazarError::ShapeMismatch { shape, expected, actual: data.len() });
        }
        Ok(Self { data, shape, requires_grad })
    }

    /// Create a tensor from a `Vec<f32>` with `requires_grad = false`.
    pub fn from_vec(values: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        Self::new(Array1::from(values), shape, false)
    }

    /// Construct without the length check; the caller guarantees the shape.
    pub(crate) fn from_parts(data: Array1<f32>, shape: Vec<usize>, requires_grad: bool) -> Self {
        Self { data, shape, requires_grad }
    }

    /// Flat element storage in row-major order.
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Logical shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Whether the tensor participates in gradient tracking.
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_shape_must_cover_data() {
        let err = Tensor::new(arr1(&[1.0, 2.0, 3.0]), vec![2, 2], false).unwrap_err();
        assert!(matches!(err, TrazarError::ShapeMismatch { expected: 4, actual: 3, .. }));
    }

    #[test]
    fn test_from_vec_scalar_shape() {
        // Empty shape is a scalar: one element.
        let t = Tensor::from_vec(vec![4.5], vec![]).unwrap();
        assert_eq!(t.len(), 1);
        assert!(t.shape().is_empty());
    }

    #[test]
    fn test_accessors() {
        let t = Tensor::new(arr1(&[1.0, 2.0, 3.0, 4.0]), vec![2, 2], true).unwrap();
        assert_eq!(t.shape(), &[2, 2]);
        assert_eq!(t.len(), 4);
        assert!(t.requires_grad());
        assert!(!t.is_empty());
    }
}
