//! Node Configuration
//!
//! Command line flags for a single node, in `--flag value` form:
//!
//! ```text
//! --bind <addr:port>          HTTP listen address (required)
//! --context-id <u64>          distributed session id (default 0)
//! --task-name <name>          name of this task in the session (default "worker")
//! --device <name>             device to register, repeatable (default CPU:0)
//! --work-queue <s|mstd[:N]>   runtime flavour (default mstd)
//! --request-timeout-ms <ms>   execute endpoint timeout (default 30000)
//! --stats-interval-secs <s>   stats log period, 0 disables (default 5)
//! --verbose                   debug logging
//! ```

use crate::host::device::DEFAULT_DEVICE;

use anyhow::{Context, Result, anyhow, bail};
use std::net::SocketAddr;
use std::time::Duration;

pub const USAGE: &str = "--bind <addr:port> [--context-id <u64>] [--task-name <name>] \
[--device <name>]... [--work-queue <s|mstd[:N]>] [--request-timeout-ms <ms>] \
[--stats-interval-secs <s>] [--verbose]";

/// Shape of the tokio runtime the node runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkQueueType {
    /// `s`: everything on the current thread (plus the blocking pool).
    SingleThreaded,
    /// `mstd` or `mstd:N`: multi-threaded, `N` workers or the tokio default.
    MultiThreaded(Option<usize>),
}

impl WorkQueueType {
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            None if s == "s" => Ok(Self::SingleThreaded),
            None if s == "mstd" => Ok(Self::MultiThreaded(None)),
            Some(("mstd", threads)) => {
                let threads: usize = threads
                    .parse()
                    .with_context(|| format!("Invalid worker count in work queue type: {}", s))?;
                if threads == 0 {
                    bail!("Work queue needs at least one worker thread");
                }
                Ok(Self::MultiThreaded(Some(threads)))
            }
            _ => Err(anyhow!("Unknown work queue type: {}", s)),
        }
    }

    pub fn build_runtime(&self) -> std::io::Result<tokio::runtime::Runtime> {
        match self {
            Self::SingleThreaded => tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build(),
            Self::MultiThreaded(threads) => {
                let mut builder = tokio::runtime::Builder::new_multi_thread();
                if let Some(threads) = threads {
                    builder.worker_threads(*threads);
                }
                builder.enable_all().build()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    pub context_id: u64,
    pub task_name: String,
    pub devices: Vec<String>,
    pub work_queue: WorkQueueType,
    pub request_timeout: Duration,
    /// `None` disables the periodic stats log.
    pub stats_interval: Option<Duration>,
    pub verbose: bool,
}

impl NodeConfig {
    /// Parses `args` as produced by `std::env::args()`; `args[0]` is skipped.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut bind_addr: Option<SocketAddr> = None;
        let mut context_id = 0u64;
        let mut task_name = "worker".to_string();
        let mut devices: Vec<String> = vec![];
        let mut work_queue = WorkQueueType::MultiThreaded(None);
        let mut request_timeout = Duration::from_millis(30_000);
        let mut stats_interval = Some(Duration::from_secs(5));
        let mut verbose = false;

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            if flag == "--verbose" {
                verbose = true;
                i += 1;
                continue;
            }

            let value = args
                .get(i + 1)
                .ok_or_else(|| anyhow!("Missing value for {}", flag))?;
            match flag {
                "--bind" => {
                    bind_addr = Some(value.parse().with_context(|| format!("Invalid --bind: {}", value))?);
                }
                "--context-id" => {
                    context_id = value
                        .parse()
                        .with_context(|| format!("Invalid --context-id: {}", value))?;
                }
                "--task-name" => task_name = value.clone(),
                "--device" => devices.push(value.clone()),
                "--work-queue" => work_queue = WorkQueueType::parse(value)?,
                "--request-timeout-ms" => {
                    let ms: u64 = value
                        .parse()
                        .with_context(|| format!("Invalid --request-timeout-ms: {}", value))?;
                    request_timeout = Duration::from_millis(ms);
                }
                "--stats-interval-secs" => {
                    let secs: u64 = value
                        .parse()
                        .with_context(|| format!("Invalid --stats-interval-secs: {}", value))?;
                    stats_interval = (secs > 0).then(|| Duration::from_secs(secs));
                }
                _ => bail!("Unknown argument: {}", flag),
            }
            i += 2;
        }

        if devices.is_empty() {
            devices.push(DEFAULT_DEVICE.to_string());
        }

        Ok(Self {
            bind_addr: bind_addr.ok_or_else(|| anyhow!("--bind is required"))?,
            context_id,
            task_name,
            devices,
            work_queue,
            request_timeout,
            stats_interval,
            verbose,
        })
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("node")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_defaults_with_only_bind() {
        let config = NodeConfig::from_args(&args(&["--bind", "127.0.0.1:6000"])).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:6000".parse().unwrap());
        assert_eq!(config.context_id, 0);
        assert_eq!(config.devices, vec!["CPU:0".to_string()]);
        assert_eq!(config.work_queue, WorkQueueType::MultiThreaded(None));
        assert_eq!(config.stats_interval, Some(Duration::from_secs(5)));
        assert_eq!(config.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_all_flags() {
        let config = NodeConfig::from_args(&args(&[
            "--bind",
            "0.0.0.0:7000",
            "--context-id",
            "42",
            "--task-name",
            "/job:worker/task:1",
            "--device",
            "CPU:0",
            "--device",
            "GPU:0",
            "--work-queue",
            "mstd:4",
            "--request-timeout-ms",
            "250",
            "--stats-interval-secs",
            "0",
            "--verbose",
        ]))
        .unwrap();

        assert_eq!(config.context_id, 42);
        assert_eq!(config.task_name, "/job:worker/task:1");
        assert_eq!(config.devices, vec!["CPU:0".to_string(), "GPU:0".to_string()]);
        assert_eq!(config.work_queue, WorkQueueType::MultiThreaded(Some(4)));
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.stats_interval, None);
        assert!(config.verbose);
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_missing_bind_is_error() {
        let err = NodeConfig::from_args(&args(&["--context-id", "1"])).unwrap_err();
        assert!(err.to_string().contains("--bind"));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(NodeConfig::from_args(&args(&["--bind", "not-an-addr"])).is_err());
        assert!(NodeConfig::from_args(&args(&["--bind", "127.0.0.1:1", "--context-id", "-3"])).is_err());
        assert!(NodeConfig::from_args(&args(&["--bind", "127.0.0.1:1", "--device"])).is_err());
        assert!(NodeConfig::from_args(&args(&["--bind", "127.0.0.1:1", "--bogus", "x"])).is_err());
    }

    #[test]
    fn test_work_queue_types() {
        assert_eq!(WorkQueueType::parse("s").unwrap(), WorkQueueType::SingleThreaded);
        assert_eq!(WorkQueueType::parse("mstd").unwrap(), WorkQueueType::MultiThreaded(None));
        assert_eq!(
            WorkQueueType::parse("mstd:8").unwrap(),
            WorkQueueType::MultiThreaded(Some(8))
        );
        assert!(WorkQueueType::parse("mstd:0").is_err());
        assert!(WorkQueueType::parse("mstd:x").is_err());
        assert!(WorkQueueType::parse("s:2").is_err());
        assert!(WorkQueueType::parse("pool").is_err());
    }

    #[test]
    fn test_single_threaded_runtime_builds() {
        let runtime = WorkQueueType::SingleThreaded.build_runtime().unwrap();
        let answer = runtime.block_on(async { 41 + 1 });
        assert_eq!(answer, 42);
    }
}
