//! Single-assignment Async Values
//!
//! An `AsyncValue` starts out pending and is resolved exactly once, either with a
//! value or with an error. Consumers never poll: they register a waiter with
//! [`AsyncValue::and_then`] (or group several values with [`run_when_ready`]) and
//! the waiter runs on whichever thread resolves the value.
//!
//! Handles are shared through `Arc`, so a producer and any number of consumers
//! can hold the same value across requests.

use crate::error::{Error, Result};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared handle to an async value.
pub type AsyncValueRef<T> = Arc<AsyncValue<T>>;

type Waiter = Box<dyn FnOnce() + Send>;

enum State<T> {
    Pending(Vec<Waiter>),
    Available(T),
    Error(Error),
}

pub struct AsyncValue<T> {
    state: Mutex<State<T>>,
}

impl<T> AsyncValue<T>
where
    T: Clone + Send + 'static,
{
    /// Creates an unresolved value. Exactly one producer is expected to resolve it.
    pub fn pending() -> AsyncValueRef<T> {
        Arc::new(Self {
            state: Mutex::new(State::Pending(Vec::new())),
        })
    }

    pub fn available(value: T) -> AsyncValueRef<T> {
        Arc::new(Self {
            state: Mutex::new(State::Available(value)),
        })
    }

    pub fn error(error: Error) -> AsyncValueRef<T> {
        Arc::new(Self {
            state: Mutex::new(State::Error(error)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_ready(&self) -> bool {
        !matches!(*self.lock(), State::Pending(_))
    }

    pub fn is_available(&self) -> bool {
        matches!(*self.lock(), State::Available(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(*self.lock(), State::Error(_))
    }

    /// Short state label, used by logging and the object inspection endpoint.
    pub fn state_name(&self) -> &'static str {
        match *self.lock() {
            State::Pending(_) => "pending",
            State::Available(_) => "available",
            State::Error(_) => "error",
        }
    }

    /// Returns the resolved outcome, or `None` while the value is still pending.
    pub fn get(&self) -> Option<Result<T>> {
        match &*self.lock() {
            State::Pending(_) => None,
            State::Available(value) => Some(Ok(value.clone())),
            State::Error(error) => Some(Err(error.clone())),
        }
    }

    pub fn set_value(&self, value: T) -> bool {
        self.resolve(Ok(value))
    }

    pub fn set_error(&self, error: Error) -> bool {
        self.resolve(Err(error))
    }

    /// Resolves the value and fires every registered waiter.
    ///
    /// Returns `false` (and leaves the value untouched) if it was already resolved.
    pub fn resolve(&self, outcome: Result<T>) -> bool {
        let waiters = {
            let mut state = self.lock();
            let waiters = match &mut *state {
                State::Pending(waiters) => std::mem::take(waiters),
                _ => {
                    tracing::warn!("Ignoring second assignment to an async value");
                    return false;
                }
            };
            *state = match outcome {
                Ok(value) => State::Available(value),
                Err(error) => State::Error(error),
            };
            waiters
        };

        // Waiters run outside the lock so they may inspect this value.
        for waiter in waiters {
            waiter();
        }
        true
    }

    /// Runs `waiter` once the value is resolved; immediately if it already is.
    pub fn and_then<F>(&self, waiter: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.lock();
            if let State::Pending(waiters) = &mut *state {
                waiters.push(Box::new(waiter));
                return;
            }
        }
        waiter();
    }

    /// Awaits resolution from async code without blocking a runtime worker.
    pub async fn wait(&self) -> Result<T> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.and_then(move || {
            let _ = tx.send(());
        });
        let _ = rx.await;

        match self.get() {
            Some(outcome) => outcome,
            None => Err(Error::kernel("async value dropped before resolution")),
        }
    }
}

/// Runs `f` exactly once, after every value in `values` is resolved.
///
/// Errors count as resolved. If all values are already resolved, `f` runs on the
/// calling thread before this returns; otherwise it runs on the thread that
/// resolves the last pending value.
pub fn run_when_ready<T, F>(values: &[AsyncValueRef<T>], f: F)
where
    T: Clone + Send + 'static,
    F: FnOnce() + Send + 'static,
{
    let pending: Vec<AsyncValueRef<T>> = values
        .iter()
        .filter(|value| !value.is_ready())
        .cloned()
        .collect();

    if pending.is_empty() {
        f();
        return;
    }

    let remaining = Arc::new(AtomicUsize::new(pending.len()));
    let callback = Arc::new(Mutex::new(Some(f)));

    for value in pending {
        let remaining = remaining.clone();
        let callback = callback.clone();
        value.and_then(move || {
            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                let f = callback
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(f) = f {
                    f();
                }
            }
        });
    }
}
