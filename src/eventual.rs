use crate::{combinators, Executor, Future, GenericExecutor, MainQueue, Timeout};

/// Read access to a value that becomes determined at most once.
///
/// Implementors provide two primitives, [`Eventual::upon`] and [`Eventual::wait`]; everything
/// else is built on top of them. [`Eventual::upon`] is the preferred way to get at the value:
///
/// ```
/// use deferred::{Deferred, Eventual, ThreadPool};
///
/// let pool = ThreadPool::builder().threads(1).spawn().unwrap();
/// let (tx, rx) = crossbeam_channel::bounded(1);
///
/// let d = Deferred::new();
/// d.upon(&pool, move |value| tx.send(value).unwrap());
/// d.fill(42);
///
/// assert_eq!(rx.recv().unwrap(), 42);
/// ```
///
/// All methods may be called from any thread.
pub trait Eventual {
    /// The type of the determined value. Every reader receives its own clone.
    type Value: Clone + Send + Sync + 'static;

    /// Calls `body` with the value once it is determined.
    ///
    /// `body` is submitted to `executor` exactly once: right away if the value is already
    /// determined, otherwise when it becomes determined.
    fn upon<E, F>(&self, executor: &E, body: F)
    where
        E: Executor + Clone + 'static,
        F: FnOnce(Self::Value) + Send + 'static;

    /// Waits for the value to become determined, blocking the calling thread for at most
    /// `timeout`.
    ///
    /// Returns [`None`] if the timeout elapsed first. Timing out has no effect on `self`, the
    /// wait may be retried.
    fn wait(&self, timeout: Timeout) -> Option<Self::Value>;

    /// Calls `body` with the value once it is determined, on the [`GenericExecutor`] matching
    /// the calling thread's priority.
    ///
    /// This call is always asynchronous, even if the value is already determined.
    fn upon_generic<F>(&self, body: F)
    where
        F: FnOnce(Self::Value) + Send + 'static,
    {
        self.upon(&GenericExecutor::current(), body)
    }

    /// Calls `body` with the value once it is determined, on the [`MainQueue`].
    ///
    /// `body` always executes asynchronously, even if this call is made from the main queue.
    fn upon_main_queue<F>(&self, body: F)
    where
        F: FnOnce(Self::Value) + Send + 'static,
    {
        self.upon(&MainQueue, body)
    }

    /// Returns the value if it is already determined.
    #[inline]
    fn peek(&self) -> Option<Self::Value> {
        self.wait(Timeout::Now)
    }

    /// Returns whether the value is determined.
    #[inline]
    fn is_filled(&self) -> bool {
        self.peek().is_some()
    }

    /// Waits for the value to become determined, then returns it.
    ///
    /// This blocks the calling thread for as long as it takes, possibly forever. It is useful in
    /// tests, but should be avoided otherwise.
    fn value(&self) -> Self::Value {
        match self.wait(Timeout::Forever) {
            Some(value) => value,
            None => unreachable!("`Timeout::Forever` elapsed"),
        }
    }

    /// Pairs the value of `self` with the value of `other`.
    ///
    /// The returned [`Future`] is determined once both inputs are.
    fn and<O>(&self, other: &O) -> Future<(Self::Value, O::Value)>
    where
        Self: Clone + Send + 'static,
        O: Eventual + Clone + Send + 'static,
    {
        combinators::and(self, other)
    }

    /// Transforms the value with `transform`, once it is determined.
    ///
    /// `transform` runs exactly once, on `executor`.
    fn map<E, U, F>(&self, executor: &E, transform: F) -> Future<U>
    where
        E: Executor + Clone + 'static,
        U: Clone + Send + Sync + 'static,
        F: FnOnce(Self::Value) -> U + Send + 'static,
    {
        combinators::map(self, executor, transform)
    }

    /// Chains another asynchronous computation onto the value.
    ///
    /// Once the value is determined, `transform` runs on `executor` and starts a computation
    /// represented by another [`Eventual`]. The returned [`Future`] is determined with that
    /// computation's value.
    fn flat_map<E, O, F>(&self, executor: &E, transform: F) -> Future<O::Value>
    where
        E: Executor + Clone + 'static,
        O: Eventual,
        F: FnOnce(Self::Value) -> O + Send + 'static,
    {
        combinators::flat_map(self, executor, transform)
    }
}

impl<E: Eventual + ?Sized> Eventual for &E {
    type Value = E::Value;

    #[inline]
    fn upon<X, F>(&self, executor: &X, body: F)
    where
        X: Executor + Clone + 'static,
        F: FnOnce(Self::Value) + Send + 'static,
    {
        (**self).upon(executor, body)
    }

    #[inline]
    fn wait(&self, timeout: Timeout) -> Option<Self::Value> {
        (**self).wait(timeout)
    }

    #[inline]
    fn is_filled(&self) -> bool {
        (**self).is_filled()
    }
}
