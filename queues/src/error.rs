// src/error.rs

use std::fmt;

/// Error returned by removal operations that found nothing to remove and no
/// capacity left to wait.
///
/// Raised synchronously by [`BoundedQueue::shift`](crate::BoundedQueue::shift)
/// and [`shift_many`](crate::BoundedQueue::shift_many) when fewer items are
/// buffered than requested, and by
/// [`BoundedFutureQueue::shift`](crate::BoundedFutureQueue::shift) when the
/// waiting-consumer backlog is already saturated. It is never delivered
/// through a deferred's error channel.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct UnderflowError;

impl std::error::Error for UnderflowError {}
impl fmt::Display for UnderflowError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "queue underflow (nothing buffered, and no capacity to wait for more)")
  }
}

/// Error carried by a deferred's error channel.
///
/// Queue capacity limits never reject a deferred; rejections come from
/// collaborators composed on top, such as the timeout wrapper.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Rejection {
  /// A timeout wrapper's duration elapsed before the wrapped deferred
  /// completed.
  TimedOut,
  /// Observed when awaiting a deferred that was cancelled out from under the
  /// awaiter.
  Cancelled,
}

impl std::error::Error for Rejection {}
impl fmt::Display for Rejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Rejection::TimedOut => write!(f, "deferred timed out"),
      Rejection::Cancelled => write!(f, "deferred cancelled"),
    }
  }
}
