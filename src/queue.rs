//! Queue-backed executors: [`ThreadPool`] and [`SerialQueue`].
//!
//! Both are FIFO queues of [`Work`] served by threads owned by the queue. Submitting never
//! blocks: the queue is unbounded, since [`Deferred::fill`][crate::Deferred::fill] submits
//! continuations and must not stall the producer while the consumers are busy.
//!
//! The threads keep running as long as any handle to the queue exists (handles are cheap to
//! clone, and continuations waiting on unfilled cells count as handles). Once the last handle is
//! gone, the threads finish the work still queued and exit.

use std::{
    fmt, io,
    num::NonZeroUsize,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, OnceLock},
    thread::{self, ThreadId},
};

use crossbeam_channel::{Receiver, Sender};

use crate::{Executor, Priority, Work};

/// Number of threads used by a [`ThreadPool`] unless configured otherwise.
pub(crate) fn default_thread_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

/// Body of every queue thread: tag the thread's priority, then run work until the channel is
/// closed.
fn serve(name: Option<String>, priority: Priority, recv: Receiver<Work>) {
    Priority::set_current(priority);
    let name = name.as_deref().unwrap_or("<unnamed>");
    log::trace!("queue thread '{name}' starting");
    for work in recv {
        // A panicking continuation must not take the whole queue down with it, every other unit
        // of work on this queue still has to run.
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(work)) {
            let msg = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("<non-string payload>");
            log::error!("work submitted to '{name}' panicked: {msg}");
        }
    }
    log::trace!("queue thread '{name}' exiting");
}

/// A builder object that can be used to configure and spawn a [`ThreadPool`].
#[derive(Debug, Clone)]
pub struct ThreadPoolBuilder {
    name: Option<String>,
    threads: usize,
    priority: Priority,
}

impl ThreadPoolBuilder {
    /// Sets the base name of the [`ThreadPool`] threads.
    ///
    /// Each thread spawned will be named according to this base name and its index.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the number of threads serving the pool.
    ///
    /// Defaults to the available parallelism of the machine.
    #[inline]
    pub fn threads(self, threads: usize) -> Self {
        Self { threads, ..self }
    }

    /// Sets the [`Priority`] the pool's threads are tagged with.
    ///
    /// Work running on the pool observes this value as [`Priority::current`].
    #[inline]
    pub fn priority(self, priority: Priority) -> Self {
        Self { priority, ..self }
    }

    /// Spawns the pool's threads.
    ///
    /// Fails with [`io::ErrorKind::InvalidInput`] if the pool was configured with 0 threads, or
    /// with the OS error if a thread cannot be spawned.
    pub fn spawn(self) -> io::Result<ThreadPool> {
        if self.threads == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "a thread pool needs at least 1 thread",
            ));
        }

        let (sender, recv) = crossbeam_channel::unbounded();
        for i in 0..self.threads {
            let mut builder = thread::Builder::new();
            let name = self.name.as_ref().map(|name| format!("{name}-{i}"));
            if let Some(name) = name.clone() {
                builder = builder.name(name);
            }
            let recv = recv.clone();
            let priority = self.priority;
            builder.spawn(move || serve(name, priority, recv))?;
        }

        Ok(ThreadPool {
            shared: Arc::new(PoolShared {
                sender,
                threads: self.threads,
                priority: self.priority,
            }),
        })
    }
}

struct PoolShared {
    sender: Sender<Work>,
    threads: usize,
    priority: Priority,
}

/// An [`Executor`] backed by a FIFO queue that several threads serve concurrently.
///
/// Work is started in submission order, but since multiple threads take work off the queue, it
/// may *complete* in any order. Cloning a [`ThreadPool`] yields another handle to the same pool.
#[derive(Clone)]
pub struct ThreadPool {
    shared: Arc<PoolShared>,
}

impl ThreadPool {
    /// Returns a builder that can be used to configure and spawn a [`ThreadPool`].
    #[inline]
    pub fn builder() -> ThreadPoolBuilder {
        ThreadPoolBuilder {
            name: None,
            threads: default_thread_count(),
            priority: Priority::Unspecified,
        }
    }

    /// Returns the number of threads serving this pool.
    #[inline]
    pub fn threads(&self) -> usize {
        self.shared.threads
    }

    /// Returns the [`Priority`] this pool's threads are tagged with.
    #[inline]
    pub fn priority(&self) -> Priority {
        self.shared.priority
    }
}

impl Executor for ThreadPool {
    fn submit(&self, work: Work) {
        // The receivers live as long as their threads, which only exit once every sender is
        // gone, and `self` holds one.
        if self.shared.sender.send(work).is_err() {
            unreachable!("thread pool threads exited while a handle was alive");
        }
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("threads", &self.shared.threads)
            .field("priority", &self.shared.priority)
            .field("queued", &self.shared.sender.len())
            .finish()
    }
}

/// A builder object that can be used to configure and spawn a [`SerialQueue`].
#[derive(Debug, Clone, Default)]
pub struct SerialQueueBuilder {
    name: Option<String>,
    priority: Priority,
}

impl SerialQueueBuilder {
    /// Sets the name of the [`SerialQueue`] thread.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the [`Priority`] the queue's thread is tagged with.
    #[inline]
    pub fn priority(self, priority: Priority) -> Self {
        Self { priority, ..self }
    }

    /// Spawns the queue's thread.
    pub fn spawn(self) -> io::Result<SerialQueue> {
        let (sender, recv) = crossbeam_channel::unbounded();
        let mut builder = thread::Builder::new();
        if let Some(name) = self.name.clone() {
            builder = builder.name(name);
        }
        let priority = self.priority;
        let name = self.name;
        let handle = builder.spawn(move || serve(name, priority, recv))?;

        Ok(SerialQueue {
            shared: Arc::new(SerialShared {
                sender,
                thread: handle.thread().id(),
                priority,
            }),
        })
    }
}

struct SerialShared {
    sender: Sender<Work>,
    thread: ThreadId,
    priority: Priority,
}

/// An [`Executor`] backed by a FIFO queue served by exactly one thread.
///
/// Work runs one unit at a time, in submission order. This makes a [`SerialQueue`] usable as an
/// event loop: everything submitted to it is serialized with respect to everything else
/// submitted to it. Cloning a [`SerialQueue`] yields another handle to the same queue.
///
/// [`SerialQueue::submit`][Executor::submit] never runs work inline, not even when called from
/// the queue's own thread.
#[derive(Clone)]
pub struct SerialQueue {
    shared: Arc<SerialShared>,
}

impl SerialQueue {
    /// Returns a builder that can be used to configure and spawn a [`SerialQueue`].
    #[inline]
    pub fn builder() -> SerialQueueBuilder {
        SerialQueueBuilder::default()
    }

    /// Returns whether the calling thread is the thread serving this queue.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.shared.thread
    }

    /// Returns the [`Priority`] this queue's thread is tagged with.
    #[inline]
    pub fn priority(&self) -> Priority {
        self.shared.priority
    }
}

impl Executor for SerialQueue {
    fn submit(&self, work: Work) {
        if self.shared.sender.send(work).is_err() {
            unreachable!("serial queue thread exited while a handle was alive");
        }
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("thread", &self.shared.thread)
            .field("priority", &self.shared.priority)
            .field("queued", &self.shared.sender.len())
            .finish()
    }
}

/// A lazily spawned, process-wide queue.
///
/// The queue is never torn down; its threads live until the process exits.
pub(crate) struct Lazy<Q> {
    cell: OnceLock<Q>,
}

impl<Q> Lazy<Q> {
    pub(crate) const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Returns the queue, spawning it with `spawn` on first access.
    ///
    /// Failing to spawn a process-wide queue leaves nowhere to run continuations, so it is
    /// treated like failing to spawn a thread with [`std::thread::spawn`].
    pub(crate) fn get_or_spawn(&self, what: &str, spawn: impl FnOnce() -> io::Result<Q>) -> &Q {
        self.cell.get_or_init(|| match spawn() {
            Ok(queue) => {
                log::debug!("spawned process-wide {what}");
                queue
            }
            Err(e) => panic!("failed to spawn process-wide {what}: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        panic::resume_unwind,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use crate::test::TIMEOUT;

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn handles_are_send_sync() {
        assert_send_sync::<ThreadPool>();
        assert_send_sync::<SerialQueue>();
    }

    #[test]
    fn pool_runs_all_work() {
        let pool = ThreadPool::builder().name("pool-test").threads(4).spawn().unwrap();
        assert_eq!(pool.threads(), 4);

        let (tx, rx) = crossbeam_channel::unbounded();
        for i in 0..100 {
            let tx = tx.clone();
            pool.submit(Box::new(move || tx.send(i).unwrap()));
        }

        let mut seen = (0..100)
            .map(|_| rx.recv_timeout(TIMEOUT).unwrap())
            .collect::<Vec<_>>();
        seen.sort();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn pool_threads_carry_priority() {
        let pool = ThreadPool::builder()
            .threads(2)
            .priority(Priority::Utility)
            .spawn()
            .unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);
        pool.submit(Box::new(move || tx.send(Priority::current()).unwrap()));
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), Priority::Utility);
    }

    #[test]
    fn pool_survives_panicking_work() {
        let pool = ThreadPool::builder().threads(1).spawn().unwrap();
        pool.submit(Box::new(|| {
            resume_unwind(Box::new("work panic"));
        }));

        let (tx, rx) = crossbeam_channel::bounded(1);
        pool.submit(Box::new(move || tx.send(()).unwrap()));
        rx.recv_timeout(TIMEOUT).unwrap();
    }

    #[test]
    fn serial_queue_is_fifo() {
        let queue = SerialQueue::builder().name("serial-test").spawn().unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = crossbeam_channel::bounded(1);
        for i in 0..50 {
            let order = order.clone();
            queue.submit(Box::new(move || order.lock().unwrap().push(i)));
        }
        queue.submit(Box::new(move || tx.send(()).unwrap()));
        rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(*order.lock().unwrap(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn serial_queue_never_runs_inline() {
        let queue = SerialQueue::builder().spawn().unwrap();
        assert!(!queue.is_current());

        let ran = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = crossbeam_channel::bounded(1);
        let q = queue.clone();
        let r = ran.clone();
        queue.submit(Box::new(move || {
            assert!(q.is_current());
            let r2 = r.clone();
            q.submit(Box::new(move || {
                r2.fetch_add(1, Ordering::SeqCst);
                tx.send(()).unwrap();
            }));
            // The nested submission must not have run yet.
            assert_eq!(r.load(Ordering::SeqCst), 0);
        }));
        rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_threads_is_an_error() {
        let err = ThreadPool::builder().threads(0).spawn().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn lazy_spawns_once() {
        static LAZY: Lazy<SerialQueue> = Lazy::new();
        let spawned = AtomicUsize::new(0);
        let spawn = || {
            spawned.fetch_add(1, Ordering::SeqCst);
            SerialQueue::builder().spawn()
        };
        let a = LAZY.get_or_spawn("test queue", spawn).shared.thread;
        let b = LAZY.get_or_spawn("test queue", spawn).shared.thread;
        assert_eq!(a, b);
        assert_eq!(spawned.load(Ordering::SeqCst), 1);
    }
}
