//! Device Registry
//!
//! Devices are addressed by an opaque token such as `CPU:0`. The request handler
//! only needs to turn a token into a live handle; anything device-specific
//! happens in the engine.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_DEVICE: &str = "CPU:0";

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Device {
    name: String,
}

impl Device {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub struct DeviceManager {
    devices: DashMap<String, Arc<Device>>,
}

impl DeviceManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            devices: DashMap::new(),
        })
    }

    pub fn with_devices<S: AsRef<str>>(names: &[S]) -> Arc<Self> {
        let manager = Self::new();
        for name in names {
            manager.add_device(name.as_ref());
        }
        manager
    }

    /// Registers a device, returning the existing handle if the name is taken.
    pub fn add_device(&self, name: &str) -> Arc<Device> {
        let device = self
            .devices
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!("Registered device: {}", name);
                Arc::new(Device::new(name))
            });
        device.value().clone()
    }

    pub fn get_device(&self, name: &str) -> Option<Arc<Device>> {
        self.devices.get(name).map(|entry| entry.value().clone())
    }

    /// Device names in sorted order.
    pub fn list_devices(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .devices
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self {
            devices: DashMap::new(),
        }
    }
}
