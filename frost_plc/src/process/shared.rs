//! Shared handle to the single process state.
//!
//! Exactly one mutex guards the plant. Callers get two operations:
//! [`SharedProcess::snapshot`] (locked copy) and [`SharedProcess::mutate`]
//! (locked closure). The guard never escapes, so no caller can hold the lock
//! across socket I/O.

use frost_common::process::ProcessState;
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle to the plant state.
#[derive(Debug, Clone)]
pub struct SharedProcess {
    inner: Arc<Mutex<ProcessState>>,
}

impl SharedProcess {
    /// Wrap the initial state.
    pub fn new(state: ProcessState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Copy of the state as of lock acquisition.
    #[inline]
    pub fn snapshot(&self) -> ProcessState {
        *self.inner.lock()
    }

    /// Run `f` with exclusive access to the state.
    ///
    /// `f` must not block; it runs inside the critical section.
    #[inline]
    pub fn mutate<R>(&self, f: impl FnOnce(&mut ProcessState) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }
}

impl Default for SharedProcess {
    fn default() -> Self {
        Self::new(ProcessState::default())
    }
}
