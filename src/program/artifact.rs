//! Compiled Program Artifacts
//!
//! The compiler emits a [`CompiledBuffer`]: a bincode-encoded [`ProgramImage`].
//! Opening a buffer yields an [`Artifact`], an immutable set of named
//! [`Function`]s. The artifact keeps its buffer alive for as long as it exists.

use super::types::TypeId;
use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Magic number at the head of every program image ("DRTP").
pub const IMAGE_MAGIC: u32 = 0x4452_5450;
pub const IMAGE_VERSION: u32 = 1;

/// Immutable, cheaply cloneable compiled program bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBuffer(Arc<[u8]>);

impl CompiledBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Arc::from(bytes))
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Literal attached to an instruction, e.g. `{value = 1, shape = [2, 2]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Attribute {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Attribute>),
}

impl Attribute {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Attribute::Int(v) => Some(*v as f64),
            Attribute::Float(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Attributes(BTreeMap<String, Attribute>);

impl Attributes {
    pub fn insert(&mut self, key: &str, value: Attribute) -> Option<Attribute> {
        self.0.insert(key.to_string(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.0.get(key)
    }

    fn require(&self, key: &str) -> Result<&Attribute> {
        self.0
            .get(key)
            .ok_or_else(|| Error::kernel(format!("Missing attribute '{}'", key)))
    }

    pub fn get_i64(&self, key: &str) -> Result<i64> {
        match self.require(key)? {
            Attribute::Int(v) => Ok(*v),
            other => Err(Error::kernel(format!("Attribute '{}' is not an integer: {:?}", key, other))),
        }
    }

    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.require(key)?
            .as_f64()
            .ok_or_else(|| Error::kernel(format!("Attribute '{}' is not numeric", key)))
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        match self.require(key)? {
            Attribute::Str(v) => Ok(v),
            other => Err(Error::kernel(format!("Attribute '{}' is not a name: {:?}", key, other))),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<&[Attribute]> {
        match self.require(key)? {
            Attribute::List(items) => Ok(items),
            other => Err(Error::kernel(format!("Attribute '{}' is not a list: {:?}", key, other))),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeId,
}

/// One kernel invocation: `%r0, %r1 = kernel(%a, %b) {attrs}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instruction {
    pub results: Vec<String>,
    pub kernel: String,
    pub operands: Vec<String>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub arguments: Vec<Param>,
    pub result_types: Vec<TypeId>,
    pub body: Vec<Instruction>,
    pub returns: Vec<String>,
}

/// Optional section: the source text each function was compiled from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebugInfo {
    pub function: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgramImage {
    pub magic: u32,
    pub version: u32,
    pub functions: Vec<FunctionDef>,
    pub debug_info: Option<Vec<DebugInfo>>,
}

impl ProgramImage {
    pub fn new(functions: Vec<FunctionDef>, debug_info: Option<Vec<DebugInfo>>) -> Self {
        Self {
            magic: IMAGE_MAGIC,
            version: IMAGE_VERSION,
            functions,
            debug_info,
        }
    }

    pub fn encode(&self) -> Result<CompiledBuffer> {
        let bytes = bincode::serialize(self).map_err(|e| Error::Decode(e.to_string()))?;
        Ok(CompiledBuffer::new(bytes))
    }

    pub fn decode(buffer: &CompiledBuffer) -> Result<Self> {
        let image: ProgramImage =
            bincode::deserialize(buffer.as_bytes()).map_err(|e| Error::Decode(e.to_string()))?;
        if image.magic != IMAGE_MAGIC {
            return Err(Error::Decode(format!("Bad magic {:#x}", image.magic)));
        }
        if image.version != IMAGE_VERSION {
            return Err(Error::Decode(format!(
                "Unsupported image version {} (expected {})",
                image.version, IMAGE_VERSION
            )));
        }
        Ok(image)
    }
}

/// A callable function inside an opened artifact.
#[derive(Debug, PartialEq)]
pub struct Function {
    name: String,
    arguments: Vec<Param>,
    result_types: Vec<TypeId>,
    body: Vec<Instruction>,
    returns: Vec<String>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[Param] {
        &self.arguments
    }

    pub fn argument_types(&self) -> Vec<TypeId> {
        self.arguments.iter().map(|param| param.ty).collect()
    }

    pub fn num_arguments(&self) -> usize {
        self.arguments.len()
    }

    pub fn result_types(&self) -> &[TypeId] {
        &self.result_types
    }

    pub fn num_results(&self) -> usize {
        self.result_types.len()
    }

    pub fn body(&self) -> &[Instruction] {
        &self.body
    }

    pub fn returns(&self) -> &[String] {
        &self.returns
    }

    /// True when the first declared argument is the implicit session context.
    pub fn takes_context(&self) -> bool {
        self.arguments
            .first()
            .is_some_and(|param| param.ty == TypeId::DistContext)
    }
}

impl From<FunctionDef> for Function {
    fn from(def: FunctionDef) -> Self {
        Self {
            name: def.name,
            arguments: def.arguments,
            result_types: def.result_types,
            body: def.body,
            returns: def.returns,
        }
    }
}

/// An opened, immutable program.
#[derive(Debug)]
pub struct Artifact {
    functions: HashMap<String, Arc<Function>>,
    debug_info: HashMap<String, String>,
    buffer: CompiledBuffer,
}

impl Artifact {
    pub fn open(buffer: CompiledBuffer) -> Result<Self> {
        if buffer.is_empty() {
            return Err(Error::Decode("empty buffer".to_string()));
        }
        let image = ProgramImage::decode(&buffer)?;

        let mut functions = HashMap::with_capacity(image.functions.len());
        for def in image.functions {
            let name = def.name.clone();
            if functions.insert(name.clone(), Arc::new(Function::from(def))).is_some() {
                return Err(Error::Decode(format!("Duplicate function @{}", name)));
            }
        }

        let debug_info = image
            .debug_info
            .unwrap_or_default()
            .into_iter()
            .map(|info| (info.function, info.source))
            .collect();

        Ok(Self {
            functions,
            debug_info,
            buffer,
        })
    }

    pub fn function(&self, name: &str) -> Option<Arc<Function>> {
        self.functions.get(name).cloned()
    }

    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn source_of(&self, function: &str) -> Option<&str> {
        self.debug_info.get(function).map(String::as_str)
    }

    pub fn has_debug_info(&self) -> bool {
        !self.debug_info.is_empty()
    }

    pub fn buffer(&self) -> &CompiledBuffer {
        &self.buffer
    }
}
