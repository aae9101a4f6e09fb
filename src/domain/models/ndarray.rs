//! Typed, shaped numeric arrays returned by remote operations.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Element type of an [`NdArray`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Bool,
    Uint8,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DType {
    /// Size of one element in bytes
    pub const fn item_size(self) -> usize {
        match self {
            Self::Bool | Self::Uint8 => 1,
            Self::Int32 | Self::Float32 => 4,
            Self::Int64 | Self::Float64 => 8,
        }
    }

    /// Lowercase type name, e.g. `float32`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Uint8 => "uint8",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

/// Flat element storage in C (row-major) order
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Bool(Vec<bool>),
    Uint8(Vec<u8>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl ArrayData {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Uint8(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
        }
    }

    /// True when there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type
    pub const fn dtype(&self) -> DType {
        match self {
            Self::Bool(_) => DType::Bool,
            Self::Uint8(_) => DType::Uint8,
            Self::Int32(_) => DType::Int32,
            Self::Int64(_) => DType::Int64,
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Bool(v) => json!(v),
            Self::Uint8(v) => json!(v),
            Self::Int32(v) => json!(v),
            Self::Int64(v) => json!(v),
            Self::Float32(v) => json!(v),
            Self::Float64(v) => json!(v),
        }
    }
}

/// Shape does not match the number of elements
#[derive(Debug, Error, PartialEq, Eq)]
#[error("shape {shape:?} requires {expected} elements, got {actual}")]
pub struct ShapeMismatch {
    pub shape: Vec<usize>,
    pub expected: usize,
    pub actual: usize,
}

/// An n-dimensional numeric array.
///
/// A zero-dimensional array (empty shape) holds exactly one element.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl NdArray {
    /// Build an array, checking that `shape` covers exactly `data.len()` elements
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, ShapeMismatch> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional `float32` array
    pub fn from_f32(values: Vec<f32>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::Float32(values),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub const fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub const fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// JSON rendering used for CLI output
    pub fn to_json(&self) -> Value {
        json!({
            "dtype": self.dtype().as_str(),
            "shape": self.shape,
            "data": self.data.to_json(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_must_match_len() {
        let err = NdArray::new(vec![2, 3], ArrayData::Int32(vec![1, 2, 3])).unwrap_err();
        assert_eq!(err.expected, 6);
        assert_eq!(err.actual, 3);

        let scalar = NdArray::new(vec![], ArrayData::Float64(vec![1.5])).unwrap();
        assert_eq!(scalar.len(), 1);
        assert!(scalar.shape().is_empty());
    }

    #[test]
    fn test_to_json() {
        let array = NdArray::new(vec![2, 2], ArrayData::Int64(vec![1, 2, 3, 4])).unwrap();
        let value = array.to_json();
        assert_eq!(value["dtype"], "int64");
        assert_eq!(value["shape"], json!([2, 2]));
        assert_eq!(value["data"], json!([1, 2, 3, 4]));
    }
}
