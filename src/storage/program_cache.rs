//! Program Cache
//!
//! Maps a program name to its opened artifact. The compiled buffer is kept next
//! to the artifact for the lifetime of the entry. Opening happens before the map
//! is touched, so a slow or failing open never holds a shard lock.

use crate::engine::executor::ExecutionEngine;
use crate::error::{Error, Result};
use crate::program::artifact::{Artifact, CompiledBuffer};

use dashmap::DashMap;
use std::sync::Arc;

/// A program and the buffer it was opened from.
struct CachedProgram {
    artifact: Arc<Artifact>,
    buffer: CompiledBuffer,
}

pub struct ProgramCache {
    programs: DashMap<String, CachedProgram>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self {
            programs: DashMap::new(),
        }
    }

    /// Opens `buffer` and stores it under `program_name`, replacing any previous
    /// entry (last write wins).
    ///
    /// # Errors
    /// Returns [`Error::Compile`] and leaves the cache untouched if the buffer
    /// cannot be opened.
    pub fn register(
        &self,
        program_name: &str,
        buffer: CompiledBuffer,
        engine: &dyn ExecutionEngine,
    ) -> Result<()> {
        let artifact = engine.open(buffer.clone()).map_err(|e| {
            tracing::error!("Failed to open compiled program {}: {}", program_name, e);
            Error::compile(program_name, e.to_string())
        })?;

        let replaced = self
            .programs
            .insert(program_name.to_string(), CachedProgram { artifact, buffer })
            .is_some();

        tracing::info!(
            "Registered program: {}{}",
            program_name,
            if replaced { " (replaced)" } else { "" }
        );
        Ok(())
    }

    pub fn lookup(&self, program_name: &str) -> Option<Arc<Artifact>> {
        self.programs
            .get(program_name)
            .map(|entry| entry.value().artifact.clone())
    }

    pub fn buffer(&self, program_name: &str) -> Option<CompiledBuffer> {
        self.programs
            .get(program_name)
            .map(|entry| entry.value().buffer.clone())
    }

    pub fn contains(&self, program_name: &str) -> bool {
        self.programs.contains_key(program_name)
    }

    pub fn remove(&self, program_name: &str) -> bool {
        let removed = self.programs.remove(program_name).is_some();
        if removed {
            tracing::info!("Evicted program: {}", program_name);
        }
        removed
    }

    pub fn clear(&self) -> usize {
        let removed = self.programs.len();
        self.programs.clear();
        removed
    }

    /// Returns a sorted list of cached program names.
    pub fn program_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .programs
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new()
    }
}
