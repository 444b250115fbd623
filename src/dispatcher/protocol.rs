//! Network Protocol Definitions
//!
//! Defines the Data Transfer Objects (DTOs) used for HTTP communication with a
//! node regarding program registration, execution and session teardown.
//! `ExecuteRequest`/`ExecuteResponse` travel as-is (see `types`).

use super::handler::HandlerStats;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENDPOINT_REGISTER: &str = "/program/register";
pub const ENDPOINT_EXECUTE: &str = "/program/execute";
/// Followed by `/{program_name}`; DELETE evicts the program.
pub const ENDPOINT_PROGRAM: &str = "/program";
pub const ENDPOINT_TEARDOWN: &str = "/internal/teardown";
pub const ENDPOINT_STATS: &str = "/stats";

/// How long the execute endpoint waits for the completion callback.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimeout(pub Duration);

fn default_disable_optional_sections() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub program_name: String,
    /// Program source text.
    pub program: String,
    #[serde(default = "default_disable_optional_sections")]
    pub disable_optional_sections: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EvictProgramResponse {
    pub removed: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TeardownRequest {
    /// Evict only objects under this prefix. `None` clears the whole session.
    #[serde(default)]
    pub prefix_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TeardownResponse {
    pub objects_removed: usize,
    pub programs_removed: usize,
}

pub type StatsResponse = HandlerStats;
