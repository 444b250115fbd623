use crate::error::Error;
use crate::storage::protocol::RemoteObjectIdProto;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier attached to one execute call for log correlation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generates a new random UUID v4-based RequestId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One result slot of an execute call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteOutput {
    /// Where the result is published in the remote object store.
    pub id: RemoteObjectIdProto,
    /// Whether the response should carry this result's serialized metadata.
    #[serde(default)]
    pub need_metadata: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteRequest {
    pub program_name: String,
    /// Function to call inside the program. Defaults to the program name.
    #[serde(default)]
    pub function_name: Option<String>,
    pub inputs: Vec<RemoteObjectIdProto>,
    pub outputs: Vec<ExecuteOutput>,
}

impl ExecuteRequest {
    pub fn new(program_name: &str) -> Self {
        Self {
            program_name: program_name.to_string(),
            function_name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_function(mut self, function_name: &str) -> Self {
        self.function_name = Some(function_name.to_string());
        self
    }

    pub fn with_input(mut self, id: RemoteObjectIdProto) -> Self {
        self.inputs.push(id);
        self
    }

    pub fn with_output(mut self, id: RemoteObjectIdProto, need_metadata: bool) -> Self {
        self.outputs.push(ExecuteOutput { id, need_metadata });
        self
    }

    pub fn function_name(&self) -> &str {
        self.function_name.as_deref().unwrap_or(&self.program_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteResponse {
    pub ok: bool,
    /// Serialized metadata, one entry per output that asked for it, in output order.
    #[serde(default)]
    pub metadata: Vec<String>,
    /// Human readable failure reason. Diagnostic only.
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecuteResponse {
    pub fn success(metadata: Vec<String>) -> Self {
        Self {
            ok: true,
            metadata,
            error: None,
        }
    }

    /// Failed responses never carry metadata.
    pub fn failure(error: &Error) -> Self {
        Self {
            ok: false,
            metadata: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}
