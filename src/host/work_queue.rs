//! Work Queue
//!
//! Thin handle over the tokio runtime used to run kernel evaluation and request
//! continuations off the caller's thread.

use tokio::runtime::Handle;

#[derive(Clone)]
pub struct WorkQueue {
    handle: Handle,
}

impl WorkQueue {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Binds to the runtime of the calling context.
    ///
    /// # Errors
    /// Fails when called outside a tokio runtime.
    pub fn current() -> anyhow::Result<Self> {
        let handle = Handle::try_current()?;
        Ok(Self::new(handle))
    }

    /// Schedules a synchronous task. Tasks are CPU-bound, so they go to the
    /// blocking pool rather than an async worker.
    pub fn add_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        drop(self.handle.spawn_blocking(task));
    }
}
