#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! Deferred producer/consumer queue primitives for single-threaded,
//! event-loop-driven Rust applications.
//!
//! Weir provides a bounded FIFO queue with backpressure
//! ([`BoundedQueue`]), a bounded producer/consumer queue with a capped
//! consumer backlog ([`BoundedFutureQueue`]), and an unbounded priority
//! queue with asynchronous `get`/`put` ([`PriorityFutureQueue`]), all built
//! on a single-assignment [`Deferred`] result that resolves synchronously
//! the moment capacity or data becomes available.
//!
//! There are no locks and no threads: "blocking" is represented entirely by
//! pending deferreds held in the queues' waiter lists, and resolution runs
//! caller continuations inline — after queue state is consistent, so a
//! continuation may immediately push or shift again.
//!
//! The [`time`] and [`toggle`] modules round out the family with a
//! cancellable [`Delay`], a [`timeout`] wrapper, an exponential-backoff
//! scheduler ([`Backoff`]), and a single-fire broadcast ([`Toggle`]).

pub mod deferred;
pub mod error;
pub mod queue;
pub mod time;
pub mod toggle;

// Public re-exports for convenience.
pub use deferred::{Deferred, Outcome};
pub use error::{Rejection, UnderflowError};
pub use queue::{BoundedFutureQueue, BoundedQueue, PriorityFutureQueue, Shifted};
pub use time::{sleep, timeout, Backoff, BackoffConfig, Delay, DelayOutcome, ScheduledCall, Timer};
pub use toggle::Toggle;
