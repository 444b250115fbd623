//! Remote Object Store
//!
//! Session-wide map from `RemoteObjectId` to the async value that produces it.
//! Producers insert their results while still pending; consumers look them up
//! and wait on the value itself. The map never waits for anything.

use super::object_id::RemoteObjectId;
use crate::error::Error;
use crate::host::async_value::{AsyncValue, AsyncValueRef};
use crate::program::types::Value;

use dashmap::DashMap;
use std::sync::Arc;

pub struct RemoteObjectStore {
    /// Used `DashMap` so concurrent requests only contend on a single shard,
    /// and only for the duration of the map operation.
    objects: DashMap<RemoteObjectId, AsyncValueRef<Value>>,
}

impl RemoteObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Inserts or overwrites the value for `id`.
    pub fn put(&self, id: RemoteObjectId, value: AsyncValueRef<Value>) {
        tracing::trace!("Stored remote object {} ({})", id, value.state_name());
        if self.objects.insert(id.clone(), value).is_some() {
            tracing::debug!("Overwrote remote object {}", id);
        }
    }

    /// Returns the value for `id`.
    ///
    /// An id that was never stored yields an already-errored value carrying
    /// [`Error::UnresolvedObject`], never a pending one. The store is not modified.
    pub fn get(&self, id: &RemoteObjectId) -> AsyncValueRef<Value> {
        match self.lookup(id) {
            Some(value) => value,
            None => {
                tracing::debug!("Remote object {} not found", id);
                AsyncValue::error(Error::UnresolvedObject(id.clone()))
            }
        }
    }

    /// Like [`get`](Self::get) but distinguishes absence with `None`.
    pub fn lookup(&self, id: &RemoteObjectId) -> Option<AsyncValueRef<Value>> {
        self.objects.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &RemoteObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn remove(&self, id: &RemoteObjectId) -> Option<AsyncValueRef<Value>> {
        self.objects.remove(id).map(|(_, value)| value)
    }

    /// Drops every object produced under `prefix_id`. Returns how many were removed.
    pub fn evict_prefix(&self, prefix_id: i32) -> usize {
        let before = self.objects.len();
        self.objects.retain(|id, _| id.prefix_id != prefix_id);
        let removed = before.saturating_sub(self.objects.len());
        tracing::info!("Evicted {} remote object(s) with prefix {}", removed, prefix_id);
        removed
    }

    pub fn clear(&self) -> usize {
        let removed = self.objects.len();
        self.objects.clear();
        tracing::info!("Cleared {} remote object(s)", removed);
        removed
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns `(pending, available, error)` counts.
    pub fn state_counts(&self) -> (usize, usize, usize) {
        let mut pending = 0;
        let mut available = 0;
        let mut failed = 0;

        for entry in self.objects.iter() {
            match entry.value().state_name() {
                "pending" => pending += 1,
                "available" => available += 1,
                _ => failed += 1,
            }
        }

        (pending, available, failed)
    }
}

impl Default for RemoteObjectStore {
    fn default() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }
}
