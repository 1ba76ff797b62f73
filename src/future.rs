use std::{fmt, future::IntoFuture};

use crate::{deferred::describe, Deferred, Eventual, Executor, Timeout, Wait};

/// A read-only handle to a [`Deferred`].
///
/// A [`Future`] observes the same cell as the [`Deferred`] it was created from, but offers no way
/// to fill it. Combinators return [`Future`]s, since their result is filled by the combinator
/// itself.
///
/// Like [`Deferred`], cloning a [`Future`] yields another handle to the same cell.
pub struct Future<T> {
    cell: Deferred<T>,
}

impl<T> Clone for Future<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Future<T> {
    /// Creates a [`Future`] whose value is already determined.
    pub fn filled(value: T) -> Self {
        Self::from(Deferred::filled(value))
    }
}

impl<T> From<Deferred<T>> for Future<T> {
    #[inline]
    fn from(cell: Deferred<T>) -> Self {
        Self { cell }
    }
}

impl<T: Clone + Send + Sync + 'static> Eventual for Future<T> {
    type Value = T;

    #[inline]
    fn upon<E, F>(&self, executor: &E, body: F)
    where
        E: Executor + Clone + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        self.cell.upon(executor, body)
    }

    #[inline]
    fn wait(&self, timeout: Timeout) -> Option<T> {
        self.cell.wait(timeout)
    }

    #[inline]
    fn is_filled(&self) -> bool {
        self.cell.is_filled()
    }
}

impl<T: fmt::Debug + Clone + Send + Sync + 'static> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        describe(f, "Future", self.peek())
    }
}

impl<T: Clone + Send + Sync + 'static> IntoFuture for Future<T> {
    type Output = T;
    type IntoFuture = Wait<T>;

    #[inline]
    fn into_future(self) -> Wait<T> {
        self.cell.into_future()
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use crate::{
        test::{block_on, TIMEOUT},
        GenericExecutor,
    };

    use super::*;

    #[test]
    fn observes_its_cell() {
        let d = Deferred::new();
        let f = d.future();
        assert!(!f.is_filled());
        assert_eq!(f.peek(), None);

        d.fill(7);
        assert!(f.is_filled());
        assert_eq!(f.peek(), Some(7));
        assert_eq!(f.clone().value(), 7);
    }

    #[test]
    fn filled_future() {
        let f = Future::filled("ready");
        assert_eq!(f.wait(Timeout::Now), Some("ready"));
    }

    #[test]
    fn upon_forwards_to_the_cell() {
        let d = Deferred::new();
        let (tx, rx) = crossbeam_channel::bounded(1);
        d.future()
            .upon(&GenericExecutor::current(), move |value| tx.send(value).unwrap());
        d.fill(1);
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 1);
    }

    #[test]
    fn wait_times_out_on_empty_cell() {
        let f = Deferred::<u8>::new().future();
        assert_eq!(f.wait(Timeout::Interval(Duration::from_millis(20))), None);
    }

    #[test]
    fn await_future() {
        let d = Deferred::new();
        let f = d.future();
        let bg = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            d.fill(99);
        });
        assert_eq!(block_on(async move { f.await }), 99);
        bg.join().unwrap();
    }

    #[test]
    fn debug_rendering() {
        let d = Deferred::new();
        let f = d.future();
        assert_eq!(format!("{f:?}"), "Future (not filled)");
        d.fill("x");
        assert_eq!(format!("{f:?}"), "Future(\"x\")");
    }
}
