//! Fill-once futures with executor-dispatched continuations.
//!
//! # Overview
//!
//! The central type is [`Deferred`]: a thread-safe cell that starts out empty and can be filled
//! exactly once. Everyone holding a handle to the cell can read the value once it is there, in
//! one of three ways:
//!
//! - register a continuation with [`Eventual::upon`], which is submitted to an [`Executor`] of
//!   the caller's choosing once the value is determined,
//! - block the calling thread with [`Eventual::wait`] (bounded by a [`Timeout`]), or
//! - `.await` it from async code.
//!
//! [`Future`] is the read-only side of a [`Deferred`], and what every combinator returns. The
//! [`Eventual`] trait covers both and provides the combinators [`Eventual::and`],
//! [`Eventual::map`] and [`Eventual::flat_map`]; [`joined_values`] and [`earliest_filled`]
//! operate on whole collections of futures.
//!
//! ## Executors
//!
//! Continuations never run while the cell is locked, and (unless [`Immediate`] is used) never
//! on the thread that fills the cell. This crate comes with:
//!
//! - [`ThreadPool`] and [`SerialQueue`], queues served by threads they own,
//! - [`GenericExecutor`], the process-wide pool for a given [`Priority`], which is what
//!   [`Eventual::upon_generic`] uses,
//! - [`MainQueue`], a process-wide serial queue for event-loop style work.
//!
//! Any other scheduler can be plugged in by implementing [`Executor`].
//!
//! # Usage
//!
//! ```
//! use deferred::{Deferred, Eventual, ThreadPool};
//!
//! let pool = ThreadPool::builder().name("parser").threads(2).spawn().unwrap();
//!
//! let input = Deferred::<String>::new();
//! let length = input.map(&pool, |text| text.len());
//! let both = input.and(&length);
//!
//! input.fill("hello world".into());
//!
//! assert_eq!(both.value(), ("hello world".to_string(), 11));
//! ```
//!
//! Computations that can fail are modeled as cells holding a [`Result`], and filled via
//! [`ResultPromise`]:
//!
//! ```
//! use std::thread;
//! use deferred::{Deferred, Eventual, ResultPromise};
//!
//! let task = Deferred::<Result<u64, String>>::new();
//! let producer = task.clone();
//! thread::spawn(move || {
//!     producer.fill_with(|| "1234".parse().map_err(|e| format!("bad input: {e}")));
//! });
//!
//! assert_eq!(task.value(), Ok(1234));
//! ```

mod combinators;
mod deferred;
mod eventual;
mod executor;
mod future;
mod global;
mod priority;
mod promise;
mod queue;
mod sync;
#[cfg(test)]
mod test;
mod timeout;

pub use combinators::{earliest_filled, joined_values};
pub use deferred::{AlreadyFilled, Deferred, Wait};
pub use eventual::Eventual;
pub use executor::{Executor, Immediate, Work};
pub use future::Future;
pub use global::{AlreadyConfigured, GenericExecutor, GlobalConfig, MainQueue};
pub use priority::{with_priority, Priority};
pub use promise::ResultPromise;
pub use queue::{SerialQueue, SerialQueueBuilder, ThreadPool, ThreadPoolBuilder};
pub use timeout::Timeout;
