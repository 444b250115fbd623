use crate::host::device::Device;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Address of one logical value in a distributed session's object space.
///
/// `prefix_id` identifies the producer's session namespace, `local_id` the value
/// within it. Two ids are equal when all three parts match; devices compare by name.
#[derive(Debug, Clone)]
pub struct RemoteObjectId {
    pub prefix_id: i32,
    pub local_id: i64,
    pub device: Arc<Device>,
}

impl RemoteObjectId {
    pub fn new(prefix_id: i32, local_id: i64, device: Arc<Device>) -> Self {
        Self {
            prefix_id,
            local_id,
            device,
        }
    }
}

impl PartialEq for RemoteObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.prefix_id == other.prefix_id
            && self.local_id == other.local_id
            && self.device.name() == other.device.name()
    }
}

impl Eq for RemoteObjectId {}

impl Hash for RemoteObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prefix_id.hash(state);
        self.local_id.hash(state);
        self.device.name().hash(state);
    }
}

impl fmt::Display for RemoteObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.prefix_id, self.local_id, self.device.name())
    }
}
