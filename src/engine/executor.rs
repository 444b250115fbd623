//! Function Execution
//!
//! [`ExecutionEngine`] is the seam between the request handler and whatever
//! actually runs programs. [`KernelEngine`] is the in-process implementation:
//! it waits for every argument without blocking, then evaluates the function
//! body on the work queue, one kernel at a time.

use super::registry::KernelRegistry;
use crate::error::{Error, Result};
use crate::host::async_value::{AsyncValue, AsyncValueRef, run_when_ready};
use crate::host::work_queue::WorkQueue;
use crate::program::artifact::{Artifact, CompiledBuffer, Function};
use crate::program::types::Value;

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub trait ExecutionEngine: Send + Sync {
    /// Opens a compiled buffer into an executable artifact.
    fn open(&self, buffer: CompiledBuffer) -> Result<Arc<Artifact>> {
        Artifact::open(buffer).map(Arc::new)
    }

    /// Schedules `function` and returns one pending value per declared result.
    ///
    /// Must not block: the returned values are resolved later, with an error if
    /// any argument resolves to an error or the body fails.
    fn execute(
        &self,
        function: &Arc<Function>,
        arguments: Vec<AsyncValueRef<Value>>,
    ) -> Vec<AsyncValueRef<Value>>;
}

pub struct KernelEngine {
    registry: Arc<KernelRegistry>,
    work_queue: WorkQueue,
}

impl KernelEngine {
    pub fn new(registry: Arc<KernelRegistry>, work_queue: WorkQueue) -> Arc<Self> {
        Arc::new(Self {
            registry,
            work_queue,
        })
    }

    pub fn registry(&self) -> &Arc<KernelRegistry> {
        &self.registry
    }
}

impl ExecutionEngine for KernelEngine {
    fn execute(
        &self,
        function: &Arc<Function>,
        arguments: Vec<AsyncValueRef<Value>>,
    ) -> Vec<AsyncValueRef<Value>> {
        let results: Vec<AsyncValueRef<Value>> = (0..function.num_results())
            .map(|_| AsyncValue::pending())
            .collect();

        let registry = self.registry.clone();
        let work_queue = self.work_queue.clone();
        let function = function.clone();
        let slots = results.clone();
        let ready_arguments = arguments.clone();

        run_when_ready(&arguments, move || {
            work_queue.add_task(move || {
                // A panicking kernel must still resolve every slot, or the
                // consumers waiting on them never run.
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    evaluate(&registry, &function, &ready_arguments)
                }))
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    tracing::error!("Function @{} panicked: {}", function.name(), message);
                    Err(Error::kernel(format!("@{} panicked: {}", function.name(), message)))
                });

                match outcome {
                    Ok(values) => {
                        for (slot, value) in slots.iter().zip(values) {
                            slot.set_value(value);
                        }
                    }
                    Err(e) => {
                        tracing::debug!("Function @{} failed: {}", function.name(), e);
                        for slot in &slots {
                            slot.set_error(e.clone());
                        }
                    }
                }
            });
        });

        results
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Interprets a function body once every argument is resolved.
fn evaluate(
    registry: &KernelRegistry,
    function: &Function,
    arguments: &[AsyncValueRef<Value>],
) -> Result<Vec<Value>> {
    if arguments.len() != function.num_arguments() {
        return Err(Error::kernel(format!(
            "@{} called with {} argument(s), expects {}",
            function.name(),
            arguments.len(),
            function.num_arguments()
        )));
    }

    let mut env: HashMap<&str, Value> = HashMap::new();

    for (param, argument) in function.arguments().iter().zip(arguments) {
        // An errored argument (e.g. an unknown remote object) fails the call as-is.
        let value = argument
            .get()
            .unwrap_or_else(|| Err(Error::kernel("argument evaluated before it was ready")))?;
        if value.type_id() != param.ty {
            return Err(Error::kernel(format!(
                "Argument %{} of @{} expects {}, got {}",
                param.name,
                function.name(),
                param.ty,
                value.type_id()
            )));
        }
        env.insert(param.name.as_str(), value);
    }

    for instruction in function.body() {
        let operands = instruction
            .operands
            .iter()
            .map(|name| {
                env.get(name.as_str())
                    .cloned()
                    .ok_or_else(|| Error::kernel(format!("Undefined value %{}", name)))
            })
            .collect::<Result<Vec<Value>>>()?;

        let outputs = registry.invoke(&instruction.kernel, &operands, &instruction.attributes)?;
        if outputs.len() != instruction.results.len() {
            return Err(Error::kernel(format!(
                "Kernel {} produced {} value(s), {} expected",
                instruction.kernel,
                outputs.len(),
                instruction.results.len()
            )));
        }
        for (name, value) in instruction.results.iter().zip(outputs) {
            env.insert(name.as_str(), value);
        }
    }

    function
        .returns()
        .iter()
        .zip(function.result_types())
        .map(|(name, ty)| {
            let value = env
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| Error::kernel(format!("Undefined return value %{}", name)))?;
            if value.type_id() != *ty {
                return Err(Error::kernel(format!(
                    "@{} returns {} for a {} result",
                    function.name(),
                    value.type_id(),
                    ty
                )));
            }
            Ok(value)
        })
        .collect()
}
