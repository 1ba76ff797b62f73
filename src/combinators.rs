//! Futures built out of other futures.
//!
//! Every combinator creates a fresh [`Deferred`] and wires it to its inputs with continuations.
//! The wiring itself is trivial (store a value, maybe fill a cell) and runs on [`Immediate`],
//! i.e. on whichever thread fills an input. User-supplied transforms never run there; they go to
//! the executor the caller passes in.

use std::{
    mem,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use crate::{sync::Mutex, Deferred, Eventual, Executor, Future, Immediate};

pub(crate) fn and<A, B>(a: &A, b: &B) -> Future<(A::Value, B::Value)>
where
    A: Eventual + Clone + Send + 'static,
    B: Eventual + Clone + Send + 'static,
{
    let result = Deferred::new();

    // Each side checks whether the other side is already there. Both inputs are filled before
    // their continuations run, so at least one side sees the other; if both do, the second fill
    // is a no-op.
    {
        let b = b.clone();
        let result = result.clone();
        a.upon(&Immediate, move |x| {
            if let Some(y) = b.peek() {
                result.fill_if_empty((x, y));
            }
        });
    }
    {
        let a = a.clone();
        let result = result.clone();
        b.upon(&Immediate, move |y| {
            if let Some(x) = a.peek() {
                result.fill_if_empty((x, y));
            }
        });
    }

    result.future()
}

pub(crate) fn map<S, E, U, F>(source: &S, executor: &E, transform: F) -> Future<U>
where
    S: Eventual + ?Sized,
    E: Executor + Clone + 'static,
    U: Clone + Send + Sync + 'static,
    F: FnOnce(S::Value) -> U + Send + 'static,
{
    let result = Deferred::new();
    let r = result.clone();
    source.upon(executor, move |value| {
        r.fill(transform(value));
    });
    result.future()
}

pub(crate) fn flat_map<S, E, O, F>(source: &S, executor: &E, transform: F) -> Future<O::Value>
where
    S: Eventual + ?Sized,
    E: Executor + Clone + 'static,
    O: Eventual,
    F: FnOnce(S::Value) -> O + Send + 'static,
{
    let result = Deferred::new();
    let r = result.clone();
    let inner_executor = executor.clone();
    source.upon(executor, move |value| {
        transform(value).upon(&inner_executor, move |inner| {
            r.fill(inner);
        });
    });
    result.future()
}

struct Join<T> {
    /// Values received so far, at the position of the future that produced them.
    slots: Mutex<Vec<Option<T>>>,
    remaining: AtomicUsize,
}

/// Collects the values of all `futures`, in the order the futures were yielded.
///
/// The returned [`Future`] is determined once every input is, regardless of the order in which
/// they complete. An empty input results in a [`Future`] that is already filled with an empty
/// [`Vec`].
///
/// ```
/// use deferred::{joined_values, Deferred, Eventual};
///
/// let cells = (0..3).map(|_| Deferred::new()).collect::<Vec<_>>();
/// let joined = joined_values(&cells);
///
/// cells[2].fill(2);
/// cells[0].fill(0);
/// assert!(!joined.is_filled());
/// cells[1].fill(1);
/// assert_eq!(joined.value(), [0, 1, 2]);
/// ```
pub fn joined_values<I>(futures: I) -> Future<Vec<<I::Item as Eventual>::Value>>
where
    I: IntoIterator,
    I::Item: Eventual,
{
    let futures = futures.into_iter().collect::<Vec<_>>();
    if futures.is_empty() {
        return Future::filled(Vec::new());
    }

    let result = Deferred::new();
    let join = Arc::new(Join {
        slots: Mutex::new((0..futures.len()).map(|_| None).collect()),
        remaining: AtomicUsize::new(futures.len()),
    });
    for (index, future) in futures.iter().enumerate() {
        let join = join.clone();
        let result = result.clone();
        future.upon(&Immediate, move |value| {
            join.slots.lock()[index] = Some(value);
            // The slot write happens-before the decrement, so whoever reaches zero sees all of
            // them.
            if join.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                let values = mem::take(&mut *join.slots.lock())
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>();
                result.fill(values);
            }
        });
    }
    result.future()
}

/// Returns a [`Future`] determined by whichever of `futures` is determined first.
///
/// Later values are silently dropped. The inputs that lose the race are not affected in any way:
/// they keep running and get filled as usual. If `futures` is empty, the returned [`Future`] is
/// never determined.
///
/// ```
/// use deferred::{earliest_filled, Deferred, Eventual};
///
/// let cells = (0..3).map(|_| Deferred::new()).collect::<Vec<_>>();
/// let earliest = earliest_filled(&cells);
///
/// cells[1].fill("second cell");
/// cells[0].fill("first cell");
/// assert_eq!(earliest.value(), "second cell");
/// ```
pub fn earliest_filled<I>(futures: I) -> Future<<I::Item as Eventual>::Value>
where
    I: IntoIterator,
    I::Item: Eventual,
{
    let result = Deferred::new();
    for future in futures {
        let result = result.clone();
        future.upon(&Immediate, move |value| {
            result.fill_if_empty(value);
        });
    }
    result.future()
}
