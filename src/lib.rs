//! Distributed Runtime Library
//!
//! This library crate defines the core modules of one node in a distributed
//! program execution runtime. It serves as the foundation for the binary
//! executable (`main.rs`).
//!
//! ## Architecture Modules
//!
//! - **`dispatcher`**: The request handler. Registers programs, executes their
//!   functions against remote objects and reports completion exactly once.
//! - **`storage`**: Session state. The remote object store (id -> async value)
//!   and the compiled program cache, both concurrent maps.
//! - **`program`**: Types, the program text compiler and compiled artifacts.
//! - **`engine`**: The execution engine and its kernel registry.
//! - **`host`**: Async values, the work queue, devices and the host/session contexts.
//! - **`config`**: Command line configuration for a node.
//! - **`error`**: The error kinds reported to callers.

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod host;
pub mod program;
pub mod storage;
