// src/deferred/mod.rs

//! A single-assignment asynchronous result for single-threaded, cooperative
//! runtimes.
//!
//! A [`Deferred`] is an explicit state machine with states Pending, Resolved,
//! Rejected, and Cancelled, plus one continuation slot. Resolution is
//! synchronous: whichever call completes the deferred runs the registered
//! continuation before returning, with all internal state updated first so
//! the continuation may freely re-enter the structure that resolved it.
//!
//! Handles are cheap `Rc` clones sharing one state machine; the type is
//! deliberately `!Send`. For integration with executors, `Deferred` also
//! implements [`Future`]: the task's waker occupies the continuation slot.
//!
//! # Examples
//!
//! ```
//! use weir::Deferred;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let deferred = Deferred::new();
//! let seen = Rc::new(Cell::new(0));
//!
//! let sink = Rc::clone(&seen);
//! deferred.on_complete(move |outcome| sink.set(outcome.unwrap()));
//!
//! // The continuation runs inside `resolve`, before it returns.
//! deferred.resolve(7);
//! assert_eq!(seen.get(), 7);
//! ```

mod core;

#[cfg(test)]
mod tests;

pub use self::core::Outcome;

use self::core::{Continuation, DeferredCore, Phase, State};
use crate::error::Rejection;

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// A handle to a value not yet known, resolvable at most once.
///
/// Clones share the same underlying state machine.
pub struct Deferred<T> {
  core: Rc<RefCell<DeferredCore<T>>>,
}

impl<T> Clone for Deferred<T> {
  fn clone(&self) -> Self {
    Deferred {
      core: Rc::clone(&self.core),
    }
  }
}

impl<T> fmt::Debug for Deferred<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Deferred")
      .field("state", &self.core.borrow().state_name())
      .finish()
  }
}

// What to run once the borrow on the core has been released.
enum Fire<T> {
  Callback(Box<dyn FnOnce(Outcome<T>)>, Outcome<T>),
  Waker(std::task::Waker),
}

impl<T> Deferred<T> {
  /// Creates a deferred in the unresolved state.
  pub fn new() -> Self {
    Deferred {
      core: Rc::new(RefCell::new(DeferredCore::new())),
    }
  }

  /// Creates a deferred that has already resolved with `value`.
  pub fn resolved(value: T) -> Self {
    Deferred {
      core: Rc::new(RefCell::new(DeferredCore {
        state: State::Resolved(Some(value)),
        continuation: None,
      })),
    }
  }

  /// Creates a deferred that has already been rejected.
  pub fn rejected(rejection: Rejection) -> Self {
    Deferred {
      core: Rc::new(RefCell::new(DeferredCore {
        state: State::Rejected(Some(rejection)),
        continuation: None,
      })),
    }
  }

  /// Resolves with `value`, running the continuation synchronously.
  ///
  /// A no-op on a cancelled deferred (the value is dropped). Panics if the
  /// deferred already resolved or rejected: a deferred completes at most
  /// once, and a second completion is a programming error.
  pub fn resolve(&self, value: T) {
    self.finish(Ok(value));
  }

  /// Rejects through the error channel. Same state rules as [`resolve`].
  ///
  /// [`resolve`]: Deferred::resolve
  pub fn reject(&self, rejection: Rejection) {
    self.finish(Err(rejection));
  }

  /// Completes with an outcome produced elsewhere, typically to mirror
  /// another deferred.
  pub fn complete(&self, outcome: Outcome<T>) {
    self.finish(outcome);
  }

  fn finish(&self, outcome: Outcome<T>) {
    let fire = {
      let mut core = self.core.borrow_mut();
      match core.phase() {
        // Cancellation detached this deferred from its producer; late
        // completions are dropped without effect.
        Phase::Cancelled => None,
        Phase::Pending => match core.continuation.take() {
          Some(Continuation::Callback(callback)) => {
            core.state = match &outcome {
              Ok(_) => State::Resolved(None),
              Err(_) => State::Rejected(None),
            };
            Some(Fire::Callback(callback, outcome))
          }
          Some(Continuation::Waker(waker)) => {
            core.state = match outcome {
              Ok(value) => State::Resolved(Some(value)),
              Err(rejection) => State::Rejected(Some(rejection)),
            };
            Some(Fire::Waker(waker))
          }
          None => {
            core.state = match outcome {
              Ok(value) => State::Resolved(Some(value)),
              Err(rejection) => State::Rejected(Some(rejection)),
            };
            None
          }
        },
        Phase::Resolved | Phase::Rejected => panic!("deferred already completed"),
      }
    };
    // State is fully consistent before any caller-supplied code runs.
    match fire {
      Some(Fire::Callback(callback, outcome)) => callback(outcome),
      Some(Fire::Waker(waker)) => waker.wake(),
      None => {}
    }
  }

  /// Cancels a pending deferred, detaching it from its producer.
  ///
  /// The continuation (if any) is dropped and will never be invoked, and any
  /// later completion attempt is silently ignored. Idempotent: cancelling an
  /// already-completed or already-cancelled deferred is a no-op.
  pub fn cancel(&self) {
    let dropped = {
      let mut core = self.core.borrow_mut();
      if let Phase::Pending = core.phase() {
        core.state = State::Cancelled;
        core.continuation.take()
      } else {
        None
      }
    };
    // Dropped outside the borrow: the continuation may own handles whose
    // drop re-enters this deferred.
    drop(dropped);
  }

  /// Registers the single continuation, invoked at most once with the
  /// resolution value or rejection.
  ///
  /// Fires immediately (before this call returns) if the deferred already
  /// completed. On a cancelled deferred the continuation is dropped unused.
  /// Panics if a continuation is already registered, or if the completed
  /// outcome was already consumed.
  pub fn on_complete<F>(&self, f: F)
  where
    F: FnOnce(Outcome<T>) + 'static,
  {
    let outcome = {
      let mut core = self.core.borrow_mut();
      match core.phase() {
        Phase::Pending => {
          assert!(
            core.continuation.is_none(),
            "deferred continuation slot already occupied"
          );
          core.continuation = Some(Continuation::Callback(Box::new(f)));
          return;
        }
        Phase::Cancelled => return,
        Phase::Resolved | Phase::Rejected => core
          .take_outcome()
          .expect("deferred outcome already consumed"),
      }
    };
    f(outcome);
  }

  /// Consumes and returns the outcome of a completed deferred.
  ///
  /// Returns `None` while pending or cancelled, and `None` again once the
  /// outcome has been consumed by a previous take, continuation, or poll.
  pub fn try_take(&self) -> Option<Outcome<T>> {
    self.core.borrow_mut().take_outcome()
  }

  /// Whether the deferred has neither completed nor been cancelled.
  pub fn is_pending(&self) -> bool {
    self.core.borrow().phase() == Phase::Pending
  }

  /// Whether the deferred resolved with a value.
  pub fn is_resolved(&self) -> bool {
    self.core.borrow().phase() == Phase::Resolved
  }

  /// Whether the deferred was rejected through the error channel.
  pub fn is_rejected(&self) -> bool {
    self.core.borrow().phase() == Phase::Rejected
  }

  /// Whether the deferred was cancelled.
  pub fn is_cancelled(&self) -> bool {
    self.core.borrow().phase() == Phase::Cancelled
  }
}

impl<T> Default for Deferred<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Future for Deferred<T> {
  type Output = Outcome<T>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut core = self.core.borrow_mut();
    match core.phase() {
      Phase::Resolved | Phase::Rejected => Poll::Ready(
        core
          .take_outcome()
          .expect("deferred outcome already consumed"),
      ),
      Phase::Cancelled => Poll::Ready(Err(Rejection::Cancelled)),
      Phase::Pending => {
        match &mut core.continuation {
          Some(Continuation::Callback(_)) => {
            panic!("deferred continuation slot already occupied")
          }
          slot => *slot = Some(Continuation::Waker(cx.waker().clone())),
        }
        Poll::Pending
      }
    }
  }
}
