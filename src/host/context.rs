//! Host and Session Contexts
//!
//! `HostContext` bundles the per-process collaborators (devices, work queue,
//! compiler, engine). `DistributedContext` is one distributed session on top of
//! it: it owns the session's remote object store and the context value that is
//! injected into functions asking for it.

use super::async_value::{AsyncValue, AsyncValueRef};
use super::device::DeviceManager;
use super::work_queue::WorkQueue;
use crate::engine::executor::{ExecutionEngine, KernelEngine};
use crate::engine::registry::KernelRegistry;
use crate::program::compiler::{Compiler, TextCompiler};
use crate::program::types::{ContextInfo, Value};
use crate::storage::remote_objects::RemoteObjectStore;

use std::sync::Arc;

pub struct HostContext {
    device_manager: Arc<DeviceManager>,
    work_queue: WorkQueue,
    compiler: Arc<dyn Compiler>,
    engine: Arc<dyn ExecutionEngine>,
}

impl HostContext {
    pub fn new(
        device_manager: Arc<DeviceManager>,
        work_queue: WorkQueue,
        compiler: Arc<dyn Compiler>,
        engine: Arc<dyn ExecutionEngine>,
    ) -> Arc<Self> {
        Arc::new(Self {
            device_manager,
            work_queue,
            compiler,
            engine,
        })
    }

    /// Text compiler plus a kernel engine loaded with the standard kernels.
    pub fn with_defaults(device_manager: Arc<DeviceManager>, work_queue: WorkQueue) -> Arc<Self> {
        let registry = KernelRegistry::with_standard_kernels();
        tracing::info!("Loaded {} kernels", registry.kernel_count());
        let engine = KernelEngine::new(registry, work_queue.clone());
        Self::new(
            device_manager,
            work_queue,
            Arc::new(TextCompiler::new()),
            engine,
        )
    }

    pub fn device_manager(&self) -> &DeviceManager {
        &self.device_manager
    }

    pub fn work_queue(&self) -> &WorkQueue {
        &self.work_queue
    }

    pub fn compiler(&self) -> &dyn Compiler {
        self.compiler.as_ref()
    }

    pub fn engine(&self) -> &dyn ExecutionEngine {
        self.engine.as_ref()
    }
}

pub struct DistributedContext {
    info: Arc<ContextInfo>,
    host: Arc<HostContext>,
    remote_objects: Arc<RemoteObjectStore>,
    /// Always available; handed to functions whose first argument is the context.
    context_value: AsyncValueRef<Value>,
}

impl DistributedContext {
    pub fn new(context_id: u64, task_name: &str, host: Arc<HostContext>) -> Arc<Self> {
        let info = Arc::new(ContextInfo {
            context_id,
            task_name: task_name.to_string(),
        });
        tracing::info!("Created distributed context {} for task {}", context_id, task_name);

        Arc::new(Self {
            context_value: AsyncValue::available(Value::Context(info.clone())),
            info,
            host,
            remote_objects: RemoteObjectStore::new(),
        })
    }

    pub fn context_id(&self) -> u64 {
        self.info.context_id
    }

    pub fn task_name(&self) -> &str {
        &self.info.task_name
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    pub fn remote_objects(&self) -> &RemoteObjectStore {
        &self.remote_objects
    }

    pub fn context_value(&self) -> AsyncValueRef<Value> {
        self.context_value.clone()
    }
}
