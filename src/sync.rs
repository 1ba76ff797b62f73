//! Locking primitives without lock poisoning.
//!
//! A [`Deferred`][crate::Deferred] never runs user code while its lock is held, so a panic can
//! only happen *outside* of a critical section. Poisoning would therefore never indicate a torn
//! state, only that some unrelated thread happened to panic, and it must not turn every later
//! `fill` or `wait` on the same cell into a panic as well.

use std::{
    sync::{self, MutexGuard, PoisonError},
    time::Instant,
};

use crate::Timeout;

pub(crate) struct Mutex<T> {
    inner: sync::Mutex<T>,
}

impl<T> Mutex<T> {
    pub(crate) const fn new(t: T) -> Self {
        Self {
            inner: sync::Mutex::new(t),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) struct Condvar {
    inner: sync::Condvar,
}

impl Condvar {
    pub(crate) const fn new() -> Self {
        Self {
            inner: sync::Condvar::new(),
        }
    }

    /// Blocks while `condition` returns `true`, giving up once `timeout` has elapsed.
    ///
    /// Returns the guard either way; the caller re-inspects the protected data to find out
    /// which of the two happened. [`Timeout::Now`] never blocks.
    pub(crate) fn wait_while<'a, T, F>(
        &self,
        mut guard: MutexGuard<'a, T>,
        timeout: Timeout,
        mut condition: F,
    ) -> MutexGuard<'a, T>
    where
        F: FnMut(&mut T) -> bool,
    {
        let deadline = match timeout.deadline_from(Instant::now()) {
            Some(deadline) => deadline,
            None => {
                return self
                    .inner
                    .wait_while(guard, condition)
                    .unwrap_or_else(PoisonError::into_inner)
            }
        };

        loop {
            if !condition(&mut guard) {
                return guard;
            }
            let now = Instant::now();
            if now >= deadline {
                return guard;
            }
            guard = self
                .inner
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub(crate) fn notify_all(&self) {
        self.inner.notify_all();
    }
}
