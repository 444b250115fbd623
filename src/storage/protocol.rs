//! Storage Network Protocol
//!
//! Defines the API endpoints and Data Transfer Objects (DTOs) used to address
//! and inspect remote objects over HTTP.

use super::object_id::RemoteObjectId;
use crate::error::{Error, Result};
use crate::host::device::DeviceManager;

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Endpoint for reading (and optionally awaiting) a remote object.
pub const ENDPOINT_GET_OBJECT: &str = "/objects/get";

// --- Data Transfer Objects ---

/// Wire form of a `RemoteObjectId`: the device is still an unresolved token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RemoteObjectIdProto {
    pub prefix_id: i32,
    pub local_id: i64,
    /// Device token, e.g. "CPU:0".
    pub device: String,
}

impl RemoteObjectIdProto {
    pub fn new(prefix_id: i32, local_id: i64, device: &str) -> Self {
        Self {
            prefix_id,
            local_id,
            device: device.to_string(),
        }
    }

    /// Resolves the device token into a live handle.
    ///
    /// # Errors
    /// [`Error::UnknownDevice`] if no such device is registered.
    pub fn resolve(&self, devices: &DeviceManager) -> Result<RemoteObjectId> {
        let device = devices
            .get_device(&self.device)
            .ok_or_else(|| Error::UnknownDevice(self.device.clone()))?;
        Ok(RemoteObjectId::new(self.prefix_id, self.local_id, device))
    }
}

/// Request to read a remote object.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetObjectRequest {
    pub id: RemoteObjectIdProto,
    /// If set, wait up to this many milliseconds for a pending object to resolve.
    #[serde(default)]
    pub wait_ms: Option<u64>,
}

/// Snapshot of a remote object.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetObjectResponse {
    /// One of "pending", "available", "error" or "unknown".
    pub status: String,
    /// JSON rendering of the value when available.
    pub value: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl GetObjectResponse {
    pub fn unknown(error: String) -> Self {
        Self {
            status: "unknown".to_string(),
            value: None,
            error: Some(error),
        }
    }
}
