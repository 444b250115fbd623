//! Request Handler
//!
//! Serves register and execute requests for one distributed session.
//!
//! ## Execute lifecycle
//! 1. **Lookup**: find the program and the function inside it.
//! 2. **Bind**: check arities, inject the session context if the function asks
//!    for it, and resolve every input id to the value in the object store.
//! 3. **Dispatch**: hand the function to the engine, which returns pending
//!    results immediately, and publish them under the output ids.
//! 4. **Await**: register one continuation over all results. Nothing blocks.
//! 5. **Assemble**: serialize requested metadata and invoke the callback.
//!
//! Any failure before step 4 completes the callback right away with `ok = false`.

use super::guard::CompletionGuard;
use super::types::{ExecuteRequest, ExecuteResponse, RequestId};
use crate::error::{Error, Result};
use crate::host::async_value::{AsyncValueRef, run_when_ready};
use crate::host::context::{DistributedContext, HostContext};
use crate::program::artifact::Function;
use crate::program::compiler::CompileOptions;
use crate::program::types::{TypeId, Value};
use crate::storage::program_cache::ProgramCache;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A function that has been handed to the engine.
struct Dispatched {
    function: Arc<Function>,
    results: Vec<AsyncValueRef<Value>>,
}

/// Point-in-time counters for logging and the stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandlerStats {
    pub context_id: u64,
    pub programs: usize,
    pub objects: usize,
    pub pending_objects: usize,
    pub available_objects: usize,
    pub failed_objects: usize,
    pub devices: Vec<String>,
}

pub struct RequestHandler {
    context: Arc<DistributedContext>,
    programs: ProgramCache,
}

impl RequestHandler {
    pub fn new(context: Arc<DistributedContext>) -> Arc<Self> {
        Arc::new(Self {
            context,
            programs: ProgramCache::new(),
        })
    }

    pub fn context(&self) -> &Arc<DistributedContext> {
        &self.context
    }

    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    fn host(&self) -> &HostContext {
        self.context.host()
    }

    /// Compiles `program` and caches it under `program_name`.
    ///
    /// Compilation runs before any lock is taken.
    ///
    /// # Errors
    /// [`Error::Compile`] if the compiler rejects the source, produces an empty
    /// buffer, or the buffer cannot be opened. The cache is untouched in that case.
    pub fn register(
        &self,
        program_name: &str,
        program: &str,
        disable_optional_sections: bool,
    ) -> Result<()> {
        let options = CompileOptions {
            disable_optional_sections,
        };

        let buffer = self
            .host()
            .compiler()
            .compile(program, &options)
            .map_err(|diagnostic| {
                tracing::error!("Failed to compile program {}: {}", program_name, diagnostic);
                Error::compile(program_name, diagnostic.to_string())
            })?;

        if buffer.is_empty() {
            tracing::error!("Compiler produced an empty buffer for {}", program_name);
            return Err(Error::compile(program_name, "compiler produced an empty buffer"));
        }

        self.programs
            .register(program_name, buffer, self.host().engine())
    }

    /// Executes a function from a registered program.
    ///
    /// Returns as soon as the work is scheduled. `done` is invoked exactly once,
    /// possibly on another thread, with the final response.
    pub fn execute<F>(&self, request: ExecuteRequest, done: F)
    where
        F: FnOnce(ExecuteResponse) + Send + 'static,
    {
        let guard = CompletionGuard::new(RequestId::new(), done);
        tracing::debug!(
            "Request {}: execute @{} of {} ({} inputs, {} outputs)",
            guard.request_id(),
            request.function_name(),
            request.program_name,
            request.inputs.len(),
            request.outputs.len()
        );

        let Dispatched { function, results } = match self.dispatch(&request) {
            Ok(dispatched) => dispatched,
            Err(e) => {
                tracing::error!("Request {} failed: {}", guard.request_id(), e);
                guard.complete(ExecuteResponse::failure(&e));
                return;
            }
        };

        // The request and results move into the continuation; nothing here
        // outlives this call on the caller's stack.
        let awaited = results.clone();
        run_when_ready(&awaited, move || {
            let response = assemble(&request, &function, &results);
            if response.ok {
                tracing::debug!("Request {} completed", guard.request_id());
            } else {
                tracing::error!(
                    "Request {} failed: {}",
                    guard.request_id(),
                    response.error.as_deref().unwrap_or("unknown error")
                );
            }
            guard.complete(response);
        });
    }

    fn dispatch(&self, request: &ExecuteRequest) -> Result<Dispatched> {
        let artifact = self
            .programs
            .lookup(&request.program_name)
            .ok_or_else(|| Error::ProgramNotFound(request.program_name.clone()))?;

        let function = artifact
            .function(request.function_name())
            .ok_or_else(|| Error::FunctionNotFound {
                program: request.program_name.clone(),
                function: request.function_name().to_string(),
            })?;

        if function.num_results() != request.outputs.len() {
            return Err(Error::ResultArityMismatch {
                expected: function.num_results(),
                received: request.outputs.len(),
            });
        }

        let mut arguments = Vec::with_capacity(function.num_arguments());
        // Allow the first argument to be the distributed context.
        if function.takes_context() {
            arguments.push(self.context.context_value());
        }
        let expected_inputs = function.num_arguments() - arguments.len();
        if expected_inputs != request.inputs.len() {
            return Err(Error::ArgumentArityMismatch {
                expected: expected_inputs,
                received: request.inputs.len(),
            });
        }

        let devices = self.host().device_manager();
        let objects = self.context.remote_objects();
        for input in &request.inputs {
            let id = input.resolve(devices)?;
            // Unknown objects are not an error yet: the errored sentinel flows
            // into the engine and fails the results.
            arguments.push(objects.get(&id));
        }

        let output_ids = request
            .outputs
            .iter()
            .map(|output| output.id.resolve(devices))
            .collect::<Result<Vec<_>>>()?;

        let results = self.host().engine().execute(&function, arguments);
        if results.len() != output_ids.len() {
            return Err(Error::kernel(format!(
                "Engine returned {} results for @{}, {} declared",
                results.len(),
                function.name(),
                output_ids.len()
            )));
        }

        // Publish while still pending so later requests find the ids.
        for (id, result) in output_ids.into_iter().zip(&results) {
            objects.put(id, result.clone());
        }

        Ok(Dispatched { function, results })
    }

    /// Evicts remote objects, and with no prefix, the program cache as well.
    ///
    /// Returns `(objects_removed, programs_removed)`.
    pub fn teardown(&self, prefix_id: Option<i32>) -> (usize, usize) {
        let objects = self.context.remote_objects();
        match prefix_id {
            Some(prefix_id) => (objects.evict_prefix(prefix_id), 0),
            None => {
                let removed_objects = objects.clear();
                let removed_programs = self.programs.clear();
                tracing::info!(
                    "Teardown removed {} objects and {} programs",
                    removed_objects,
                    removed_programs
                );
                (removed_objects, removed_programs)
            }
        }
    }

    pub fn stats(&self) -> HandlerStats {
        let objects = self.context.remote_objects();
        let (pending, available, failed) = objects.state_counts();
        HandlerStats {
            context_id: self.context.context_id(),
            programs: self.programs.len(),
            objects: objects.len(),
            pending_objects: pending,
            available_objects: available,
            failed_objects: failed,
            devices: self.host().device_manager().list_devices(),
        }
    }
}

/// Builds the response once every result is resolved.
fn assemble(
    request: &ExecuteRequest,
    function: &Function,
    results: &[AsyncValueRef<Value>],
) -> ExecuteResponse {
    let mut metadata = Vec::new();

    for (index, output) in request.outputs.iter().enumerate() {
        if !output.need_metadata {
            continue;
        }
        match serialize_metadata(function.result_types()[index], &results[index]) {
            Ok(serialized) => metadata.push(serialized),
            Err(e) => return ExecuteResponse::failure(&e),
        }
    }

    ExecuteResponse::success(metadata)
}

fn serialize_metadata(declared: TypeId, result: &AsyncValueRef<Value>) -> Result<String> {
    if declared != TypeId::Tensor {
        return Err(Error::UnsupportedMetadataType(declared));
    }

    let value = result
        .get()
        .unwrap_or_else(|| Err(Error::kernel("result assembled before it was ready")))?;

    match value.as_tensor() {
        Some(tensor) => tensor.metadata().serialize(),
        None => Err(Error::UnsupportedMetadataType(value.type_id())),
    }
}
