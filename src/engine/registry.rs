//! Kernel Registry
//!
//! A dynamic registry that maps kernel names (e.g. "t.add") to executable Rust
//! closures. Program bodies refer to kernels by name only, so the engine stays
//! generic and new kernels can be added without touching the interpreter.

use crate::error::{Error, Result};
use crate::program::artifact::Attributes;
use crate::program::types::Value;

use dashmap::DashMap;
use std::sync::Arc;

/// Type alias for a thread-safe, synchronous kernel.
/// It takes the resolved operand values plus the instruction attributes and
/// returns one value per declared instruction result.
pub type KernelFn = Arc<dyn Fn(&[Value], &Attributes) -> Result<Vec<Value>> + Send + Sync>;

/// Registry holding the mapping between kernel names and their implementation.
pub struct KernelRegistry {
    kernels: DashMap<String, KernelFn>,
}

impl KernelRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            kernels: DashMap::new(),
        })
    }

    /// Creates a registry preloaded with the standard kernel set.
    pub fn with_standard_kernels() -> Arc<Self> {
        let registry = Self::new();
        super::kernels::register_standard_kernels(&registry);
        registry
    }

    /// Registers a kernel under a specific name, replacing any previous one.
    ///
    /// # Arguments
    /// * `kernel_name` - The name programs use to call the kernel (e.g., "t.add").
    /// * `kernel` - The closure that implements it.
    pub fn register<F>(&self, kernel_name: &str, kernel: F)
    where
        F: Fn(&[Value], &Attributes) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.kernels.insert(kernel_name.to_string(), Arc::new(kernel));

        tracing::debug!("Registered kernel: {}", kernel_name);
    }

    pub fn get(&self, kernel_name: &str) -> Option<KernelFn> {
        self.kernels.get(kernel_name).map(|entry| entry.value().clone())
    }

    /// Looks up a kernel by name and invokes it.
    ///
    /// # Returns
    /// * `Ok(values)` if the kernel ran successfully.
    /// * `Err` if the kernel failed or if no kernel exists for the given name.
    pub fn invoke(&self, kernel_name: &str, args: &[Value], attributes: &Attributes) -> Result<Vec<Value>> {
        // Clone the Arc out so the shard lock is not held while the kernel runs.
        match self.get(kernel_name) {
            Some(kernel) => {
                tracing::trace!("Invoking kernel '{}' with {} operand(s)", kernel_name, args.len());
                kernel(args, attributes)
            }
            None => {
                let error = format!("Unknown kernel: {}", kernel_name);
                tracing::error!("{}", error);
                Err(Error::Kernel(error))
            }
        }
    }

    /// Returns a sorted list of all registered kernel names.
    pub fn list_kernels(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .kernels
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn has_kernel(&self, kernel_name: &str) -> bool {
        self.kernels.contains_key(kernel_name)
    }

    pub fn kernel_count(&self) -> usize {
        self.kernels.len()
    }
}

impl Default for KernelRegistry {
    fn default() -> Self {
        Self {
            kernels: DashMap::new(),
        }
    }
}
