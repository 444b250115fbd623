//! Request Dispatch Module
//!
//! Accepts register and execute requests for one distributed session and turns
//! them into engine work.
//!
//! ## Architecture Overview
//! 1. **Register**: Program text is compiled once and the opened artifact is
//!    cached by name (last write wins).
//! 2. **Execute**: A cached function is bound to inputs from the remote object
//!    store and dispatched. Results are published immediately as pending values.
//! 3. **Complete**: When every result resolves, requested metadata is serialized
//!    and the caller's callback fires, exactly once, on whatever thread
//!    resolved the last result.
//!
//! ## Submodules
//! - **`handler`**: `RequestHandler`, the register/execute core.
//! - **`guard`**: Exactly-once delivery of the completion callback.
//! - **`types`**: Execute request and response shapes.
//! - **`protocol`**: HTTP contracts for the remaining endpoints.
//! - **`handlers`**: axum endpoints over `RequestHandler`.
//! - **`client`**: reqwest client for a remote node.

pub mod client;
pub mod guard;
pub mod handler;
pub mod handlers;
pub mod protocol;
pub mod types;
