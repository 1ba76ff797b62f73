//! The [`Executor`] capability and its simplest implementations.
//!
//! An [`Executor`] accepts a unit of [`Work`] and promises that it will eventually run, on some
//! thread, at some point after [`Executor::submit`] was called. Continuations registered on a
//! [`Deferred`][crate::Deferred] are always handed to the executor they were registered with;
//! the cell itself never decides where user code runs.
//!
//! This crate ships the following executors:
//!
//! - [`ThreadPool`][crate::ThreadPool]: a FIFO queue served concurrently by several threads.
//! - [`SerialQueue`][crate::SerialQueue]: a FIFO queue served by a single thread.
//! - [`GenericExecutor`][crate::GenericExecutor]: a process-wide pool matching the caller's
//!   [`Priority`][crate::Priority].
//! - [`MainQueue`][crate::MainQueue]: the process-wide main serial queue.
//! - [`Immediate`]: runs work synchronously inside `submit`.

use std::sync::Arc;

/// A unit of work handed to an [`Executor`].
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// A capability that runs submitted [`Work`].
///
/// Implementations must eventually run every submitted unit of work exactly once. They make no
/// ordering promises relative to work submitted to *other* executors.
pub trait Executor: Send + Sync {
    /// Schedules `work` for execution.
    ///
    /// Unless an implementation documents otherwise, `work` runs asynchronously with respect to
    /// the caller of `submit`.
    fn submit(&self, work: Work);
}

impl<E: Executor + ?Sized> Executor for &E {
    #[inline]
    fn submit(&self, work: Work) {
        (**self).submit(work)
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    #[inline]
    fn submit(&self, work: Work) {
        (**self).submit(work)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    #[inline]
    fn submit(&self, work: Work) {
        (**self).submit(work)
    }
}

/// An [`Executor`] that runs work on the calling thread, before `submit` returns.
///
/// Since the work of a continuation is submitted at fill time, a continuation registered with
/// [`Immediate`] runs on the thread calling [`Deferred::fill`][crate::Deferred::fill] (or on
/// the thread registering it, if the cell was already filled). That makes it useful for
/// deterministic tests and for wiring cells together, but anything slow or blocking should go
/// to a real queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Executor for Immediate {
    #[inline]
    fn submit(&self, work: Work) {
        work();
    }
}
