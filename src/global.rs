//! Process-wide executors: [`GenericExecutor`] and [`MainQueue`].
//!
//! Both are backed by queues that are spawned lazily on first use and live for the rest of the
//! process. Their shape can be configured once, before first use, with [`GlobalConfig`].

use std::{error::Error, fmt, num::NonZeroUsize, sync::OnceLock};

use crate::{
    queue::{default_thread_count, Lazy},
    Executor, Priority, SerialQueue, ThreadPool, Work,
};

static CONFIG: OnceLock<GlobalConfig> = OnceLock::new();

/// One pool per resolved priority class, indexed by `Priority::slot`.
static POOLS: [Lazy<ThreadPool>; 5] = [
    Lazy::new(),
    Lazy::new(),
    Lazy::new(),
    Lazy::new(),
    Lazy::new(),
];

static MAIN: Lazy<SerialQueue> = Lazy::new();

fn config() -> &'static GlobalConfig {
    CONFIG.get_or_init(GlobalConfig::new)
}

/// Configuration of the process-wide queues.
///
/// By default, every priority class is served by its own pool with one thread per available
/// CPU, and all threads are named with the prefix `deferred`.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    threads: usize,
    name_prefix: String,
}

impl GlobalConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            threads: default_thread_count(),
            name_prefix: "deferred".into(),
        }
    }

    /// Sets the number of threads of each priority class's pool.
    #[inline]
    pub fn threads(self, threads: NonZeroUsize) -> Self {
        Self {
            threads: threads.get(),
            ..self
        }
    }

    /// Sets the prefix for the names of all process-wide threads.
    ///
    /// Pool threads are named `<prefix>-<priority>-<index>`, the main queue thread
    /// `<prefix>-main`.
    pub fn name_prefix<N: Into<String>>(self, prefix: N) -> Self {
        Self {
            name_prefix: prefix.into(),
            ..self
        }
    }

    /// Makes this the configuration of the process-wide queues.
    ///
    /// This only works once, and only before any process-wide queue was used: the first use
    /// locks in the default configuration.
    pub fn install(self) -> Result<(), AlreadyConfigured> {
        CONFIG.set(self).map_err(|_| AlreadyConfigured { _priv: () })
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// An error returned by [`GlobalConfig::install`] when the process-wide queues were already
/// configured (explicitly, or implicitly by using one of them).
#[derive(Debug, Clone)]
pub struct AlreadyConfigured {
    _priv: (),
}

impl Error for AlreadyConfigured {}

impl fmt::Display for AlreadyConfigured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the process-wide queues are already configured")
    }
}

fn pool(priority: Priority) -> &'static ThreadPool {
    let priority = priority.resolved();
    POOLS[priority.slot()].get_or_spawn("thread pool", || {
        let config = config();
        ThreadPool::builder()
            .name(format!("{}-{priority}", config.name_prefix))
            .threads(config.threads)
            .priority(priority)
            .spawn()
    })
}

/// The catch-all [`Executor`] for work that does not care where it runs, as long as it runs at
/// the right priority.
///
/// A [`GenericExecutor`] is bound to a [`Priority`] when it is created, and submits to the
/// process-wide pool serving that priority. [`GenericExecutor::current`] captures the calling
/// thread's priority, so continuations registered through
/// [`Eventual::upon_generic`][crate::Eventual::upon_generic] run at the priority of the code
/// that registered them instead of being demoted to some fixed background priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericExecutor {
    priority: Priority,
}

impl GenericExecutor {
    /// Returns the generic executor matching the calling thread's [`Priority::current`].
    #[inline]
    pub fn current() -> Self {
        Self::for_priority(Priority::current())
    }

    /// Returns the generic executor serving `priority`.
    #[inline]
    pub fn for_priority(priority: Priority) -> Self {
        Self {
            priority: priority.resolved(),
        }
    }

    /// Returns the (resolved) priority this executor submits at.
    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }
}

impl Executor for GenericExecutor {
    fn submit(&self, work: Work) {
        pool(self.priority).submit(work)
    }
}

/// The process-wide main queue.
///
/// This is a [`SerialQueue`] whose thread is tagged [`Priority::UserInteractive`]. Work
/// submitted to it never runs inside [`Executor::submit`], even when submitting from the main
/// queue itself, so a continuation registered with [`MainQueue`] can never re-enter the code
/// that fills the cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct MainQueue;

impl MainQueue {
    fn queue() -> &'static SerialQueue {
        MAIN.get_or_spawn("main queue", || {
            SerialQueue::builder()
                .name(format!("{}-main", config().name_prefix))
                .priority(Priority::UserInteractive)
                .spawn()
        })
    }

    /// Returns whether the calling thread is the main queue's thread.
    pub fn is_current() -> bool {
        MainQueue::queue().is_current()
    }
}

impl Executor for MainQueue {
    fn submit(&self, work: Work) {
        MainQueue::queue().submit(work)
    }
}
