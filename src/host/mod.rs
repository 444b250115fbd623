//! Host Runtime Module
//!
//! The primitives every request relies on but none of them owns.
//!
//! ## Submodules
//! - **`async_value`**: Single-assignment futures with completion callbacks and
//!   `run_when_ready` for waiting on a group without blocking.
//! - **`work_queue`**: Handle onto the tokio runtime for CPU-bound tasks.
//! - **`device`**: Registry turning device tokens ("CPU:0") into handles.
//! - **`context`**: `HostContext` (per process) and `DistributedContext` (per session).

pub mod async_value;
pub mod context;
pub mod device;
pub mod work_queue;
