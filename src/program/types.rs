use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Declared type of a function argument or result.
///
/// Compared by value; the textual spelling only matters to the compiler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TypeId {
    /// The per-session distributed context, injected implicitly when a function
    /// declares it as its first argument.
    DistContext,
    Tensor,
    I32,
    I64,
    F32,
    Chain,
}

impl TypeId {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "!dist.dist_context" => Some(TypeId::DistContext),
            "!t.tensor" => Some(TypeId::Tensor),
            "i32" => Some(TypeId::I32),
            "i64" => Some(TypeId::I64),
            "f32" => Some(TypeId::F32),
            "!hex.chain" => Some(TypeId::Chain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeId::DistContext => "!dist.dist_context",
            TypeId::Tensor => "!t.tensor",
            TypeId::I32 => "i32",
            TypeId::I64 => "i64",
            TypeId::F32 => "f32",
            TypeId::Chain => "!hex.chain",
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element type of a dense host tensor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F32,
    I32,
    I64,
}

impl DType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "f32" => Some(DType::F32),
            "i32" => Some(DType::I32),
            "i64" => Some(DType::I64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    I32(Vec<i32>),
    I64(Vec<i64>),
}

impl TensorData {
    fn len(&self) -> usize {
        match self {
            TensorData::F32(values) => values.len(),
            TensorData::I32(values) => values.len(),
            TensorData::I64(values) => values.len(),
        }
    }

    fn dtype(&self) -> DType {
        match self {
            TensorData::F32(_) => DType::F32,
            TensorData::I32(_) => DType::I32,
            TensorData::I64(_) => DType::I64,
        }
    }

    /// Fills a buffer of `len` elements of `dtype` with `value`.
    pub fn splat(dtype: DType, len: usize, value: f64) -> Self {
        match dtype {
            DType::F32 => TensorData::F32(vec![value as f32; len]),
            DType::I32 => TensorData::I32(vec![value as i32; len]),
            DType::I64 => TensorData::I64(vec![value as i64; len]),
        }
    }
}

/// Descriptive part of a tensor: what the requester gets back in an execute
/// response when it asks for metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TensorMetadata {
    pub dtype: DType,
    pub shape: Vec<i64>,
}

impl TensorMetadata {
    pub fn serialize(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::kernel(e.to_string()))
    }

    pub fn deserialize(serialized: &str) -> Result<Self> {
        serde_json::from_str(serialized).map_err(|e| Error::Decode(e.to_string()))
    }
}

/// Number of elements a shape holds.
///
/// # Errors
/// [`Error::Kernel`] for negative dimensions or a count that does not fit in `usize`.
pub fn element_count(shape: &[i64]) -> Result<usize> {
    shape.iter().try_fold(1usize, |count, dim| {
        usize::try_from(*dim)
            .ok()
            .and_then(|dim| count.checked_mul(dim))
            .ok_or_else(|| Error::kernel(format!("Shape {:?} is too large or negative", shape)))
    })
}

/// Dense row-major host tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<i64>,
    data: TensorData,
}

impl Tensor {
    pub fn new(shape: Vec<i64>, data: TensorData) -> Result<Self> {
        if shape.iter().any(|dim| *dim < 0) {
            return Err(Error::kernel(format!("Negative dimension in shape {:?}", shape)));
        }
        let expected = element_count(&shape)?;
        if expected != data.len() {
            return Err(Error::kernel(format!(
                "Shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    pub fn metadata(&self) -> TensorMetadata {
        TensorMetadata {
            dtype: self.dtype(),
            shape: self.shape.clone(),
        }
    }

    /// Element-wise sum. Operands must agree on dtype and shape.
    pub fn add(&self, other: &Tensor) -> Result<Tensor> {
        if self.shape != other.shape {
            return Err(Error::kernel(format!(
                "Shape mismatch in add: {:?} vs {:?}",
                self.shape, other.shape
            )));
        }
        let data = match (&self.data, &other.data) {
            (TensorData::F32(a), TensorData::F32(b)) => {
                TensorData::F32(a.iter().zip(b).map(|(x, y)| x + y).collect())
            }
            (TensorData::I32(a), TensorData::I32(b)) => {
                TensorData::I32(a.iter().zip(b).map(|(x, y)| x.wrapping_add(*y)).collect())
            }
            (TensorData::I64(a), TensorData::I64(b)) => {
                TensorData::I64(a.iter().zip(b).map(|(x, y)| x.wrapping_add(*y)).collect())
            }
            _ => {
                return Err(Error::kernel(format!(
                    "DType mismatch in add: {:?} vs {:?}",
                    self.dtype(),
                    other.dtype()
                )));
            }
        };
        Tensor::new(self.shape.clone(), data)
    }

    pub fn add_scalar(&self, scalar: f64) -> Tensor {
        self.map(|x| x + scalar)
    }

    pub fn mul_scalar(&self, scalar: f64) -> Tensor {
        self.map(|x| x * scalar)
    }

    fn map(&self, op: impl Fn(f64) -> f64) -> Tensor {
        let data = match &self.data {
            TensorData::F32(values) => {
                TensorData::F32(values.iter().map(|x| op(*x as f64) as f32).collect())
            }
            TensorData::I32(values) => {
                TensorData::I32(values.iter().map(|x| op(*x as f64) as i32).collect())
            }
            TensorData::I64(values) => {
                TensorData::I64(values.iter().map(|x| op(*x as f64) as i64).collect())
            }
        };
        Tensor {
            shape: self.shape.clone(),
            data,
        }
    }
}

/// The implicit context argument, as seen by kernels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextInfo {
    pub context_id: u64,
    pub task_name: String,
}

/// An opaque runtime value flowing between kernels and across requests.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Tensor(Arc<Tensor>),
    I32(i32),
    I64(i64),
    F32(f32),
    Chain,
    Context(Arc<ContextInfo>),
}

impl Value {
    pub fn tensor(tensor: Tensor) -> Self {
        Value::Tensor(Arc::new(tensor))
    }

    pub fn type_id(&self) -> TypeId {
        match self {
            Value::Tensor(_) => TypeId::Tensor,
            Value::I32(_) => TypeId::I32,
            Value::I64(_) => TypeId::I64,
            Value::F32(_) => TypeId::F32,
            Value::Chain => TypeId::Chain,
            Value::Context(_) => TypeId::DistContext,
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Value::Tensor(tensor) => Some(tensor.as_ref()),
            _ => None,
        }
    }

    /// JSON rendering for inspection endpoints.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Tensor(tensor) => serde_json::json!({
                "type": TypeId::Tensor.as_str(),
                "metadata": tensor.metadata(),
                "data": tensor.data(),
            }),
            Value::I32(v) => serde_json::json!({ "type": "i32", "value": v }),
            Value::I64(v) => serde_json::json!({ "type": "i64", "value": v }),
            Value::F32(v) => serde_json::json!({ "type": "f32", "value": v }),
            Value::Chain => serde_json::json!({ "type": TypeId::Chain.as_str() }),
            Value::Context(info) => serde_json::json!({
                "type": TypeId::DistContext.as_str(),
                "context": info.as_ref(),
            }),
        }
    }
}
