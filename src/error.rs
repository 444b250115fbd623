//! Runtime Error Types
//!
//! A single error enum shared by the request handler, the program cache, the
//! object store and the reference engine. Errors must be cloneable because an
//! errored `AsyncValue` hands the same error to every consumer.

use crate::program::types::TypeId;
use crate::storage::object_id::RemoteObjectId;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The compiler rejected the program, or the artifact could not be opened.
    #[error("Failed to compile program '{program}': {reason}")]
    Compile { program: String, reason: String },

    #[error("Can't find program: [{0}]")]
    ProgramNotFound(String),

    #[error("Failed to get function '{function}' from program '{program}'")]
    FunctionNotFound { program: String, function: String },

    #[error("Result size mismatch: fn #result: {expected} Received #outputs: {received}")]
    ResultArityMismatch { expected: usize, received: usize },

    #[error("Argument size mismatch: fn #arg: {expected} Received #inputs: {received}")]
    ArgumentArityMismatch { expected: usize, received: usize },

    #[error("Can't find device: {0}")]
    UnknownDevice(String),

    /// The object id was never produced within this session.
    #[error("Unknown remote object: {0}")]
    UnresolvedObject(RemoteObjectId),

    #[error("Invalid type {0} for metadata serialization")]
    UnsupportedMetadataType(TypeId),

    /// A kernel failed or the engine could not evaluate a function body.
    #[error("Kernel failure: {0}")]
    Kernel(String),

    #[error("Failed to decode compiled program: {0}")]
    Decode(String),
}

impl Error {
    pub fn kernel(message: impl Into<String>) -> Self {
        Self::Kernel(message.into())
    }

    pub fn compile(program: &str, reason: impl Into<String>) -> Self {
        Self::Compile {
            program: program.to_string(),
            reason: reason.into(),
        }
    }
}
