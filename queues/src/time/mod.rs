// src/time/mod.rs

//! Time utilities: the event loop's timer seam, cancellable delays, a
//! timeout wrapper, and an exponential-backoff sleep scheduler.
//!
//! The queues themselves never time out; composition with time lives here,
//! behind the [`Timer`] trait so production code and tests can supply their
//! own clocks (see the `weir_testing` crate's manual-advance timer).

use crate::deferred::{Deferred, Outcome};
use crate::error::Rejection;

use log::trace;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

#[cfg(feature = "tokio")]
mod tokio_timer;

#[cfg(feature = "tokio")]
pub use tokio_timer::TokioTimer;

/// The event loop's timer service.
///
/// Implementations run `call` once, `after` the given duration has elapsed,
/// unless the returned handle cancels it first.
pub trait Timer {
  /// Schedules `call` to run once after `after`.
  fn schedule(&self, after: Duration, call: Box<dyn FnOnce()>) -> ScheduledCall;
}

/// Handle to a scheduled timer call.
///
/// Dropping the handle does not cancel the call; only [`cancel`] does.
///
/// [`cancel`]: ScheduledCall::cancel
pub struct ScheduledCall {
  canceller: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl ScheduledCall {
  /// Wraps the timer-specific cancellation hook.
  pub fn new<F>(canceller: F) -> Self
  where
    F: FnOnce() + 'static,
  {
    ScheduledCall {
      canceller: RefCell::new(Some(Box::new(canceller))),
    }
  }

  /// A handle whose cancellation does nothing, for calls that already ran.
  pub fn noop() -> Self {
    ScheduledCall {
      canceller: RefCell::new(None),
    }
  }

  /// Prevents a not-yet-fired call from ever running. Idempotent.
  pub fn cancel(&self) {
    let canceller = self.canceller.borrow_mut().take();
    if let Some(cancel) = canceller {
      cancel();
    }
  }
}

impl fmt::Debug for ScheduledCall {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ScheduledCall")
      .field("armed", &self.canceller.borrow().is_some())
      .finish()
  }
}

/// How a [`Delay`] resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayOutcome {
  /// The full duration elapsed.
  Elapsed,
  /// The delay was cancelled and resolved early.
  Cancelled,
}

impl DelayOutcome {
  /// Whether the delay was cut short by cancellation.
  pub fn was_cancelled(self) -> bool {
    matches!(self, DelayOutcome::Cancelled)
  }
}

/// A cancellable, timer-driven delay.
///
/// Resolves with [`DelayOutcome::Elapsed`] when the duration passes, or —
/// if [`cancel`](Delay::cancel) is called first — immediately with
/// [`DelayOutcome::Cancelled`]. Cancellation is a marker, not an error: the
/// deferred resolves either way.
#[derive(Debug)]
pub struct Delay {
  deferred: Deferred<DelayOutcome>,
  call: ScheduledCall,
}

/// Returns a delay that resolves once `after` has elapsed on `timer`.
pub fn sleep(timer: &dyn Timer, after: Duration) -> Delay {
  let deferred = Deferred::new();
  let resolver = deferred.clone();
  let call = timer.schedule(
    after,
    Box::new(move || resolver.resolve(DelayOutcome::Elapsed)),
  );
  trace!("sleep scheduled for {:?}", after);
  Delay { deferred, call }
}

impl Delay {
  /// Stops sleeping: cancels the timer entry and resolves early with
  /// [`DelayOutcome::Cancelled`]. A no-op once the delay has resolved.
  pub fn cancel(&self) {
    if self.deferred.is_pending() {
      self.call.cancel();
      self.deferred.resolve(DelayOutcome::Cancelled);
    }
  }

  /// A shared handle to the underlying deferred.
  pub fn deferred(&self) -> Deferred<DelayOutcome> {
    self.deferred.clone()
  }
}

impl Future for Delay {
  type Output = Outcome<DelayOutcome>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    Pin::new(&mut this.deferred).poll(cx)
  }
}

/// Returns a deferred mirroring `inner`, unless `after` elapses first.
///
/// An already-completed `inner` is returned unchanged and no timer entry is
/// created. Otherwise, if `inner` completes in time its outcome transfers to
/// the returned deferred and the timer entry is cancelled; if the duration
/// elapses first, the returned deferred rejects with
/// [`Rejection::TimedOut`] and detaches — `inner`'s eventual outcome is
/// dropped silently.
pub fn timeout<T: 'static>(timer: &dyn Timer, after: Duration, inner: Deferred<T>) -> Deferred<T> {
  if !inner.is_pending() {
    return inner;
  }

  let wrapped = Deferred::new();

  let on_expiry = wrapped.clone();
  let guard = timer.schedule(
    after,
    Box::new(move || {
      if on_expiry.is_pending() {
        trace!("deferred timed out after {:?}", after);
        on_expiry.reject(Rejection::TimedOut);
      }
    }),
  );

  let mirror = wrapped.clone();
  inner.on_complete(move |outcome| {
    // Already timed out (or cancelled by the caller): the wrapper has
    // detached, and the late outcome is dropped.
    if mirror.is_pending() {
      guard.cancel();
      mirror.complete(outcome);
    }
  });

  wrapped
}

/// Configuration for [`Backoff`].
///
/// Defaults: one minute minimum, ten minutes maximum, one minute increment,
/// no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackoffConfig {
  /// Starting (and post-reset) delay.
  pub min: Duration,
  /// Ceiling the delay saturates at.
  pub max: Duration,
  /// Linear growth applied after each sleep.
  pub increment: Duration,
  /// When non-zero, a uniformly random duration in `[0, jitter)` is added to
  /// each sleep, keeping many schedulers from falling into lockstep.
  pub jitter: Duration,
}

impl Default for BackoffConfig {
  fn default() -> Self {
    BackoffConfig {
      min: Duration::from_secs(60),
      max: Duration::from_secs(600),
      increment: Duration::from_secs(60),
      jitter: Duration::ZERO,
    }
  }
}

/// Manages the amount of time to sleep between iterations of a task.
///
/// Each [`sleep`](Backoff::sleep) uses the current delay and then grows it
/// by `increment`, saturating at `max`; [`reset`](Backoff::reset) drops back
/// to `min`, usually after an iteration that produced fresh data.
#[derive(Debug)]
pub struct Backoff {
  config: BackoffConfig,
  delay: Duration,
}

impl Backoff {
  /// Creates a scheduler starting at `config.min`.
  pub fn new(config: BackoffConfig) -> Self {
    Backoff {
      delay: config.min,
      config,
    }
  }

  /// Resets the delay to the minimum.
  pub fn reset(&mut self) {
    self.delay = self.config.min;
  }

  /// The delay the next [`sleep`](Backoff::sleep) will use, before jitter.
  pub fn current_delay(&self) -> Duration {
    self.delay
  }

  /// Returns a delay for the current backoff, then advances it.
  pub fn sleep(&mut self, timer: &dyn Timer) -> Delay {
    let mut after = self.delay;
    if !self.config.jitter.is_zero() {
      after += self.config.jitter.mul_f64(rand::random::<f64>());
    }
    self.delay = (self.delay + self.config.increment).min(self.config.max);
    sleep(timer, after)
  }
}
