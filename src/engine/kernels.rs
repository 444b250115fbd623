//! Standard kernel set.

use super::registry::KernelRegistry;
use crate::error::{Error, Result};
use crate::program::artifact::{Attribute, Attributes};
use crate::program::types::{DType, Tensor, TensorData, Value, element_count};

/// Largest tensor `t.constant` will materialize.
const MAX_CONSTANT_ELEMENTS: usize = 1 << 28;

pub fn register_standard_kernels(registry: &KernelRegistry) {
    registry.register("t.constant", constant_tensor);
    registry.register("t.add", |args, _| {
        expect_arity("t.add", args, 2)?;
        let sum = tensor_arg("t.add", args, 0)?.add(tensor_arg("t.add", args, 1)?)?;
        Ok(vec![Value::tensor(sum)])
    });
    registry.register("t.add_scalar", |args, attrs| {
        expect_arity("t.add_scalar", args, 1)?;
        let scalar = attrs.get_f64("value")?;
        Ok(vec![Value::tensor(tensor_arg("t.add_scalar", args, 0)?.add_scalar(scalar))])
    });
    registry.register("t.mul_scalar", |args, attrs| {
        expect_arity("t.mul_scalar", args, 1)?;
        let scalar = attrs.get_f64("value")?;
        Ok(vec![Value::tensor(tensor_arg("t.mul_scalar", args, 0)?.mul_scalar(scalar))])
    });
    registry.register("t.identity", |args, _| {
        expect_arity("t.identity", args, 1)?;
        Ok(vec![args[0].clone()])
    });
    registry.register("i64.constant", |args, attrs| {
        expect_arity("i64.constant", args, 0)?;
        Ok(vec![Value::I64(attrs.get_i64("value")?)])
    });
    registry.register("i64.add", |args, _| {
        expect_arity("i64.add", args, 2)?;
        match (&args[0], &args[1]) {
            (Value::I64(a), Value::I64(b)) => Ok(vec![Value::I64(a.wrapping_add(*b))]),
            (a, b) => Err(Error::kernel(format!(
                "i64.add expects i64 operands, got {} and {}",
                a.type_id(),
                b.type_id()
            ))),
        }
    });
    registry.register("dist.context_id", |args, _| {
        expect_arity("dist.context_id", args, 1)?;
        match &args[0] {
            Value::Context(info) => Ok(vec![Value::I64(info.context_id as i64)]),
            other => Err(Error::kernel(format!(
                "dist.context_id expects the distributed context, got {}",
                other.type_id()
            ))),
        }
    });
    registry.register("hex.new_chain", |args, _| {
        expect_arity("hex.new_chain", args, 0)?;
        Ok(vec![Value::Chain])
    });
    registry.register("test.fail", |_, attrs| {
        let message = attrs.get_str("message").unwrap_or("test.fail invoked");
        Err(Error::kernel(message))
    });
}

/// `t.constant() {dtype = f32, shape = [2], value = 1.5}` fills the tensor with
/// `value`; `values = [..]` supplies every element instead.
fn constant_tensor(args: &[Value], attrs: &Attributes) -> Result<Vec<Value>> {
    expect_arity("t.constant", args, 0)?;

    let dtype_name = attrs.get_str("dtype")?;
    let dtype = DType::parse(dtype_name)
        .ok_or_else(|| Error::kernel(format!("Unsupported dtype '{}'", dtype_name)))?;

    let shape = attrs
        .get_list("shape")?
        .iter()
        .map(|dim| match dim {
            Attribute::Int(v) => Ok(*v),
            other => Err(Error::kernel(format!("Shape dimension must be an integer: {:?}", other))),
        })
        .collect::<Result<Vec<i64>>>()?;
    let len = element_count(&shape)?;
    if len > MAX_CONSTANT_ELEMENTS {
        return Err(Error::kernel(format!(
            "t.constant shape {:?} holds {} elements, limit is {}",
            shape, len, MAX_CONSTANT_ELEMENTS
        )));
    }

    let data = match attrs.get("values") {
        Some(Attribute::List(items)) => {
            let numbers = items
                .iter()
                .map(|item| {
                    item.as_f64()
                        .ok_or_else(|| Error::kernel(format!("Non-numeric tensor element: {:?}", item)))
                })
                .collect::<Result<Vec<f64>>>()?;
            match dtype {
                DType::F32 => TensorData::F32(numbers.iter().map(|v| *v as f32).collect()),
                DType::I32 => TensorData::I32(numbers.iter().map(|v| *v as i32).collect()),
                DType::I64 => TensorData::I64(numbers.iter().map(|v| *v as i64).collect()),
            }
        }
        Some(other) => {
            return Err(Error::kernel(format!("Attribute 'values' must be a list: {:?}", other)));
        }
        None => TensorData::splat(dtype, len, attrs.get_f64("value")?),
    };

    Ok(vec![Value::tensor(Tensor::new(shape, data)?)])
}

fn expect_arity(kernel: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(Error::kernel(format!(
            "{} expects {} operand(s), got {}",
            kernel,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn tensor_arg<'a>(kernel: &str, args: &'a [Value], index: usize) -> Result<&'a Tensor> {
    args[index].as_tensor().ok_or_else(|| {
        Error::kernel(format!(
            "{} operand {} must be a tensor, got {}",
            kernel,
            index,
            args[index].type_id()
        ))
    })
}
