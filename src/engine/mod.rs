//! Execution Engine Module
//!
//! Runs functions from opened artifacts on the host.
//!
//! ## Submodules
//! - **`executor`**: The `ExecutionEngine` seam and the `KernelEngine` interpreter.
//! - **`registry`**: Maps kernel names (e.g., "t.add") to Rust closures.
//! - **`kernels`**: The standard kernel set registered by default.

pub mod executor;
pub mod kernels;
pub mod registry;
