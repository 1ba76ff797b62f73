use crate::Deferred;

/// Filling a [`Deferred`] that holds the [`Result`] of a computation.
///
/// These are conveniences over [`Deferred::fill`], with the same contract: filling a cell that is
/// already filled panics.
///
/// ```
/// use deferred::{Deferred, Eventual, ResultPromise};
///
/// let task = Deferred::<Result<u32, String>>::new();
/// task.fill_with(|| "42".parse::<u32>().map_err(|e| e.to_string()));
/// assert_eq!(task.value(), Ok(42));
/// ```
pub trait ResultPromise {
    /// The value of a successful computation.
    type Success;
    /// The error of a failed computation.
    type Failure;

    /// Fills the cell with `Ok(value)`.
    fn succeed(&self, value: Self::Success) -> bool;

    /// Fills the cell with `Err(error)`.
    fn fail(&self, error: Self::Failure) -> bool;

    /// Runs `computation` on the calling thread and fills the cell with whatever it returns.
    fn fill_with<F>(&self, computation: F) -> bool
    where
        F: FnOnce() -> Result<Self::Success, Self::Failure>;
}

impl<V, E> ResultPromise for Deferred<Result<V, E>>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Success = V;
    type Failure = E;

    #[track_caller]
    fn succeed(&self, value: V) -> bool {
        self.fill(Ok(value))
    }

    #[track_caller]
    fn fail(&self, error: E) -> bool {
        self.fill(Err(error))
    }

    #[track_caller]
    fn fill_with<F>(&self, computation: F) -> bool
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.fill(computation())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use crate::{test::TIMEOUT, Eventual, GenericExecutor, Timeout};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        First,
        Second,
    }

    #[test]
    fn succeed() {
        let d = Deferred::<Result<i32, TestError>>::new();
        assert!(d.succeed(1));
        assert_eq!(d.wait(Timeout::Now), Some(Ok(1)));
    }

    #[test]
    fn fail() {
        let d = Deferred::<Result<i32, TestError>>::new();
        assert!(d.fail(TestError::First));
        assert_eq!(d.peek(), Some(Err(TestError::First)));
    }

    #[test]
    fn fill_with_success_and_failure() {
        let ok = Deferred::<Result<&str, TestError>>::new();
        ok.fill_with(|| Ok("done"));
        assert_eq!(ok.value(), Ok("done"));

        let err = Deferred::<Result<&str, TestError>>::new();
        err.fill_with(|| Err(TestError::Second));
        assert_eq!(err.value(), Err(TestError::Second));
    }

    #[test]
    fn fill_with_runs_on_calling_thread() {
        let d = Deferred::<Result<std::thread::ThreadId, TestError>>::new();
        d.fill_with(|| Ok(std::thread::current().id()));
        assert_eq!(d.value(), Ok(std::thread::current().id()));
    }

    #[test]
    fn completed_task_cannot_be_completed_again() {
        let d = Deferred::<Result<i32, TestError>>::new();
        d.succeed(1);
        catch_unwind(AssertUnwindSafe(|| d.fail(TestError::First))).unwrap_err();
        catch_unwind(AssertUnwindSafe(|| d.fill_with(|| Ok(2)))).unwrap_err();
        assert_eq!(d.value(), Ok(1));
    }

    #[test]
    fn failure_reaches_continuations() {
        let d = Deferred::<Result<i32, TestError>>::new();
        let (tx, rx) = crossbeam_channel::bounded(1);
        d.upon(&GenericExecutor::current(), move |result| {
            tx.send(result).unwrap()
        });
        d.fail(TestError::Second);
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), Err(TestError::Second));
    }
}
