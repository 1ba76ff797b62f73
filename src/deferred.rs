use std::{
    any::TypeId,
    error::Error,
    fmt,
    future::IntoFuture,
    mem,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    sync::{Arc, OnceLock},
    task::{Context, Poll, Waker},
};

use crate::{
    sync::{Condvar, Mutex},
    Eventual, Executor, Future, Immediate, Timeout,
};

/// A fill-once cell holding a value that becomes available at some point.
///
/// A [`Deferred`] starts out empty (or is created filled with [`Deferred::filled`]). Any holder
/// may [`fill`][Deferred::fill] it, which determines its value once and for all, and any number
/// of holders may read it, either by registering a continuation with [`Eventual::upon`], by
/// blocking with [`Eventual::wait`], or by `.await`ing it.
///
/// Cloning a [`Deferred`] does not clone the value: every clone refers to the same cell, so
/// filling one of them fills all of them. Hand out [`Deferred::future`] to consumers that should
/// not be able to fill the cell.
///
/// Readers receive clones of the value, made without holding any lock, so a [`Clone`] impl may
/// itself use the cell. For values that are expensive to clone, store an [`Arc`] in the cell.
pub struct Deferred<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    /// Written once, while `pending` is locked. Read without locking.
    value: OnceLock<T>,
    /// Continuations registered while the cell was empty, in registration order.
    pending: Mutex<Vec<Continuation<T>>>,
    /// Wakes threads blocked in `wait` once the value is there.
    condvar: Condvar,
}

/// A callback waiting for the value, together with the executor it has to run on.
struct Continuation<T> {
    executor: Box<dyn Executor>,
    body: Box<dyn FnOnce(T) + Send>,
}

impl<T: Send + 'static> Continuation<T> {
    fn dispatch(self, value: T) {
        let body = self.body;
        self.executor.submit(Box::new(move || body(value)));
    }
}

impl<T> Clone for Deferred<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> Deferred<T> {
    /// Creates an empty [`Deferred`].
    pub fn new() -> Self {
        Self::with_value(OnceLock::new())
    }

    /// Creates a [`Deferred`] that is already filled with `value`.
    pub fn filled(value: T) -> Self {
        Self::with_value(OnceLock::from(value))
    }

    fn with_value(value: OnceLock<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                value,
                pending: Mutex::new(Vec::new()),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Returns a read-only [`Future`] handle to this cell.
    #[inline]
    pub fn future(&self) -> Future<T> {
        Future::from(self.clone())
    }

    /// Fills the cell with `value`, or hands `value` back if the cell is already filled.
    ///
    /// On success, every continuation registered so far is submitted to its executor, and every
    /// thread blocked in [`Eventual::wait`] is woken up.
    ///
    /// If submitting a continuation panics (which happens when an inline executor such as
    /// [`Immediate`] runs a panicking body), the remaining continuations are still dispatched,
    /// and the first panic is resumed afterwards.
    pub fn try_fill(&self, value: T) -> Result<(), AlreadyFilled<T>> {
        let pending = {
            let mut pending = self.shared.pending.lock();
            if let Err(value) = self.shared.value.set(value) {
                return Err(AlreadyFilled { value });
            }
            mem::take(&mut *pending)
        };
        self.shared.condvar.notify_all();

        if pending.is_empty() {
            return Ok(());
        }
        log::trace!("filled a `Deferred`, dispatching {} continuations", pending.len());

        let mut payload = None;
        for continuation in pending {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                continuation.dispatch(self.get().clone())
            }));
            if let Err(p) = result {
                payload.get_or_insert(p);
            }
        }
        if let Some(payload) = payload {
            panic::resume_unwind(payload);
        }
        Ok(())
    }

    /// Fills the cell with `value`.
    ///
    /// Always returns `true`: filling a cell more than once is a logic error in the producer.
    ///
    /// # Panics
    ///
    /// Panics if the cell is already filled. The value already in the cell is left untouched.
    /// When several producers race to fill the same cell on purpose, use
    /// [`Deferred::fill_if_empty`] instead.
    #[track_caller]
    pub fn fill(&self, value: T) -> bool {
        match self.try_fill(value) {
            Ok(()) => true,
            Err(e) => panic!("{e}"),
        }
    }

    /// Fills the cell with `value` if it is still empty.
    ///
    /// Returns whether this call filled the cell. If it didn't, `value` is dropped and nothing
    /// else happens; the first value always wins.
    pub fn fill_if_empty(&self, value: T) -> bool {
        self.try_fill(value).is_ok()
    }

    /// The stored value. Only called once the cell is known to be filled.
    fn get(&self) -> &T {
        match self.shared.value.get() {
            Some(value) => value,
            None => unreachable!("`Deferred` read before it was filled"),
        }
    }

    /// Registers a continuation, or dispatches it right away if the cell is already filled.
    fn register(&self, continuation: Continuation<T>) {
        {
            let mut pending = self.shared.pending.lock();
            if self.shared.value.get().is_none() {
                pending.push(continuation);
                return;
            }
        }
        continuation.dispatch(self.get().clone());
    }

    fn wait_timeout(&self, timeout: Timeout) -> Option<T> {
        if let Some(value) = self.shared.value.get() {
            return Some(value.clone());
        }
        if timeout != Timeout::Now {
            let pending = self.shared.pending.lock();
            drop(self.shared.condvar.wait_while(pending, timeout, |_| {
                self.shared.value.get().is_none()
            }));
        }
        self.shared.value.get().cloned()
    }

    fn filled_now(&self) -> bool {
        self.shared.value.get().is_some()
    }
}

impl<T: Clone + Send + Sync + 'static> Eventual for Deferred<T> {
    type Value = T;

    fn upon<E, F>(&self, executor: &E, body: F)
    where
        E: Executor + Clone + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        self.register(Continuation {
            executor: Box::new(executor.clone()),
            body: Box::new(body),
        });
    }

    #[inline]
    fn wait(&self, timeout: Timeout) -> Option<T> {
        self.wait_timeout(timeout)
    }

    #[inline]
    fn is_filled(&self) -> bool {
        self.filled_now()
    }
}

/// Renders `Name(value)`, `Name (filled)` for `()`-valued cells, or `Name (not filled)`.
pub(crate) fn describe<T: fmt::Debug + 'static>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    value: Option<T>,
) -> fmt::Result {
    match value {
        Some(_) if TypeId::of::<T>() == TypeId::of::<()>() => write!(f, "{name} (filled)"),
        Some(value) => write!(f, "{name}({value:?})"),
        None => write!(f, "{name} (not filled)"),
    }
}

impl<T: fmt::Debug + Clone + Send + Sync + 'static> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        describe(f, "Deferred", self.peek())
    }
}

impl<T: Clone + Send + Sync + 'static> IntoFuture for Deferred<T> {
    type Output = T;
    type IntoFuture = Wait<T>;

    fn into_future(self) -> Wait<T> {
        Wait {
            cell: self,
            waker: None,
        }
    }
}

/// A [`std::future::Future`] resolving to the value of a [`Deferred`].
///
/// Returned by the [`IntoFuture`] implementations of [`Deferred`] and [`Future`]. It does not
/// depend on any particular async runtime.
pub struct Wait<T> {
    cell: Deferred<T>,
    /// Where the registered continuation finds the waker to wake. Only the most recent waker is
    /// kept, so polling repeatedly does not pile up continuations.
    waker: Option<Arc<Mutex<Option<Waker>>>>,
}

impl<T: Clone + Send + Sync + 'static> std::future::Future for Wait<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if let Some(value) = self.cell.peek() {
            return Poll::Ready(value);
        }

        match self.waker.clone() {
            Some(slot) => *slot.lock() = Some(cx.waker().clone()),
            None => {
                let slot = Arc::new(Mutex::new(Some(cx.waker().clone())));
                let wake = slot.clone();
                self.cell.upon(&Immediate, move |_| {
                    let waker = wake.lock().take();
                    if let Some(waker) = waker {
                        waker.wake();
                    }
                });
                self.waker = Some(slot);
            }
        }

        // The cell may have been filled after the check above, but before the new waker was
        // visible to the continuation.
        match self.cell.peek() {
            Some(value) => Poll::Ready(value),
            None => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for Wait<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wait").finish_non_exhaustive()
    }
}

/// An error returned by [`Deferred::try_fill`] when the cell was already filled.
///
/// Contains the value that could not be stored.
pub struct AlreadyFilled<T> {
    value: T,
}

impl<T> AlreadyFilled<T> {
    /// Returns the value that was rejected.
    #[inline]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> fmt::Debug for AlreadyFilled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlreadyFilled").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for AlreadyFilled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("attempted to fill a `Deferred` that is already filled")
    }
}

impl<T> Error for AlreadyFilled<T> {}
