//! Scheduling priority classes and the per-thread priority tag.
//!
//! Threads do not have an OS-provided quality-of-service class that this crate could query
//! portably, so the "current priority" is a thread-local tag. Threads spawned by this crate's
//! queues tag themselves with the priority they were configured with, which means that work
//! dispatched through [`GenericExecutor`][crate::GenericExecutor] keeps its priority across any
//! number of asynchronous hops. Threads owned by the application start out as
//! [`Priority::Unspecified`] and can be tagged with [`Priority::set_current`] or
//! [`with_priority`].

use std::{cell::Cell, fmt};

thread_local! {
    static CURRENT: Cell<Priority> = const { Cell::new(Priority::Unspecified) };
}

/// A scheduling priority class, ordered from least to most urgent.
///
/// [`Priority::Unspecified`] sorts last; it is not "more urgent" than anything, it just has
/// nowhere else to go. Use [`Priority::resolved`] to map it to the class it is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    /// Work the user is not aware of, such as prefetching or maintenance.
    Background,
    /// Long-running work the user knows about but does not wait on.
    Utility,
    /// The class that serves work without a more specific priority.
    Default,
    /// Work the user started and is waiting for.
    UserInitiated,
    /// Work that keeps the user interface responsive. The main queue runs at this priority.
    UserInteractive,
    /// No priority was assigned. Served by [`Priority::Default`].
    #[default]
    Unspecified,
}

impl Priority {
    /// All priority classes, in order.
    pub const ALL: [Priority; 6] = [
        Priority::Background,
        Priority::Utility,
        Priority::Default,
        Priority::UserInitiated,
        Priority::UserInteractive,
        Priority::Unspecified,
    ];

    /// Returns the priority the calling thread is tagged with.
    #[inline]
    pub fn current() -> Self {
        CURRENT.with(Cell::get)
    }

    /// Tags the calling thread with `priority`, returning its previous priority.
    pub fn set_current(priority: Priority) -> Priority {
        CURRENT.with(|cur| cur.replace(priority))
    }

    /// Returns the priority class that actually serves work tagged with `self`.
    ///
    /// This is the identity, except for [`Priority::Unspecified`], which is served by
    /// [`Priority::Default`].
    #[inline]
    pub fn resolved(self) -> Self {
        match self {
            Priority::Unspecified => Priority::Default,
            other => other,
        }
    }

    /// Returns a short lowercase name, used for thread names.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Background => "background",
            Priority::Utility => "utility",
            Priority::Default => "default",
            Priority::UserInitiated => "user-initiated",
            Priority::UserInteractive => "user-interactive",
            Priority::Unspecified => "unspecified",
        }
    }

    /// Index among the resolved (served) classes.
    pub(crate) fn slot(self) -> usize {
        match self.resolved() {
            Priority::Background => 0,
            Priority::Utility => 1,
            Priority::Default | Priority::Unspecified => 2,
            Priority::UserInitiated => 3,
            Priority::UserInteractive => 4,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs `f` with the calling thread tagged as `priority`.
///
/// The previous tag is restored afterwards, also when `f` panics.
pub fn with_priority<R>(priority: Priority, f: impl FnOnce() -> R) -> R {
    struct Restore(Priority);

    impl Drop for Restore {
        fn drop(&mut self) {
            Priority::set_current(self.0);
        }
    }

    let _restore = Restore(Priority::set_current(priority));
    f()
}

#[cfg(test)]
mod tests {
    use std::{
        panic::{catch_unwind, resume_unwind},
        thread,
    };

    use super::*;

    #[test]
    fn ordering() {
        assert!(Priority::Background < Priority::Utility);
        assert!(Priority::Utility < Priority::Default);
        assert!(Priority::Default < Priority::UserInitiated);
        assert!(Priority::UserInitiated < Priority::UserInteractive);
        let mut sorted = Priority::ALL;
        sorted.sort();
        assert_eq!(sorted, Priority::ALL);
    }

    #[test]
    fn unspecified_resolves_to_default() {
        assert_eq!(Priority::Unspecified.resolved(), Priority::Default);
        assert_eq!(Priority::Utility.resolved(), Priority::Utility);
        assert_eq!(Priority::Unspecified.slot(), Priority::Default.slot());
    }

    #[test]
    fn fresh_threads_are_unspecified() {
        thread::spawn(|| assert_eq!(Priority::current(), Priority::Unspecified))
            .join()
            .unwrap();
    }

    #[test]
    fn scoped_priority_is_restored() {
        thread::spawn(|| {
            Priority::set_current(Priority::Utility);
            let inner = with_priority(Priority::UserInitiated, Priority::current);
            assert_eq!(inner, Priority::UserInitiated);
            assert_eq!(Priority::current(), Priority::Utility);

            catch_unwind(|| {
                with_priority(Priority::Background, || {
                    resume_unwind(Box::new("unwind"));
                })
            })
            .unwrap_err();
            assert_eq!(Priority::current(), Priority::Utility);
        })
        .join()
        .unwrap();
    }
}
