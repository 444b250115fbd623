//! Distributed Storage Module
//!
//! The two pieces of shared mutable state a request handler works against.
//!
//! ## Core Concepts
//! - **Addressing**: A `RemoteObjectId` names one logical value as
//!   `(prefix, local id, device)`; on the wire the device is a token string.
//! - **Objects**: `RemoteObjectStore` maps ids to async values. Results are
//!   published while still pending, so consumers wait on readiness, not existence.
//! - **Programs**: `ProgramCache` maps a program name to its opened artifact.
//! - **Locking**: Both are `DashMap`s; locks are held for one map operation only.

pub mod handlers;
pub mod object_id;
pub mod program_cache;
pub mod protocol;
pub mod remote_objects;

#[cfg(test)]
mod tests;
