//! Internal unit test utilities.

use std::{
    future::Future,
    pin::pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    task::{Context, Poll, Wake, Waker},
    time::Duration,
};

use crate::{
    sync::{Condvar, Mutex},
    Executor, Timeout, Work,
};

/// How long tests wait for asynchronous work before declaring it lost.
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Polls a future to completion, returning its result.
pub fn block_on<R, F: Future<Output = R>>(fut: F) -> R {
    struct RealWaker {
        /// Waiters are signaled by incrementing this number and notifying the `Condvar`.
        mtx: Mutex<u64>,
        condvar: Condvar,
    }
    impl Wake for RealWaker {
        fn wake(self: Arc<Self>) {
            *self.mtx.lock() += 1;
            self.condvar.notify_all();
        }
    }

    let arc = Arc::new(RealWaker {
        mtx: Mutex::new(0),
        condvar: Condvar::new(),
    });
    let waker = Waker::from(arc.clone());
    let mut cx = Context::from_waker(&waker);

    let mut fut = pin!(fut);
    loop {
        let cur = *arc.mtx.lock();
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(value) => return value,
            Poll::Pending => {
                let guard = arc.mtx.lock();
                drop(arc.condvar.wait_while(guard, Timeout::Forever, |n| *n == cur));
            }
        }
    }
}

/// An executor that runs work inline, like [`Immediate`][crate::Immediate], and counts how often
/// it was asked to.
#[derive(Debug, Clone, Default)]
pub struct CountingExecutor {
    count: Arc<AtomicUsize>,
}

impl CountingExecutor {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    #[track_caller]
    pub fn assert_called(&self, times: usize) {
        assert_eq!(self.count(), times, "unexpected number of submissions");
    }
}

impl Executor for CountingExecutor {
    fn submit(&self, work: Work) {
        self.count.fetch_add(1, Ordering::SeqCst);
        work();
    }
}
