//! The queue family: bounded FIFO backpressure, bounded producer/consumer
//! hand-off with a capped consumer backlog, and an unbounded priority queue
//! with asynchronous `get`/`put`.
//!
//! All three types share one discipline: operations that cannot complete
//! immediately return a pending [`Deferred`](crate::Deferred) held in the
//! queue's internal waiter lists, and a later operation by the opposite role
//! resolves the oldest compatible waiter synchronously — after the queue's
//! own state is fully consistent, so resolution continuations may re-enter
//! the queue.

pub mod bounded;
pub mod future_queue;
pub mod priority;

pub use bounded::BoundedQueue;
pub use future_queue::{BoundedFutureQueue, Shifted};
pub use priority::PriorityFutureQueue;
