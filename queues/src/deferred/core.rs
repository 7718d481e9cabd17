// src/deferred/core.rs

use crate::error::Rejection;

use std::fmt;
use std::task::Waker;

/// Outcome delivered to a continuation or awaiter: the resolution value, or
/// the rejection carried by the error channel.
pub type Outcome<T> = Result<T, Rejection>;

// Coarse view of the state machine, used for dispatch and Debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
  Pending,
  Resolved,
  Rejected,
  Cancelled,
}

pub(super) enum State<T> {
  Pending,
  /// `None` once the value has been consumed by a continuation, a take, or a
  /// poll. The deferred still reports itself resolved afterwards.
  Resolved(Option<T>),
  Rejected(Option<Rejection>),
  Cancelled,
}

/// The single continuation slot. A callback and a waker are mutually
/// exclusive; wakers may be re-registered on every poll, callbacks may not.
pub(super) enum Continuation<T> {
  Callback(Box<dyn FnOnce(Outcome<T>)>),
  Waker(Waker),
}

pub(super) struct DeferredCore<T> {
  pub(super) state: State<T>,
  pub(super) continuation: Option<Continuation<T>>,
}

impl<T> DeferredCore<T> {
  pub(super) fn new() -> Self {
    DeferredCore {
      state: State::Pending,
      continuation: None,
    }
  }

  pub(super) fn phase(&self) -> Phase {
    match self.state {
      State::Pending => Phase::Pending,
      State::Resolved(_) => Phase::Resolved,
      State::Rejected(_) => Phase::Rejected,
      State::Cancelled => Phase::Cancelled,
    }
  }

  /// Takes the completed outcome out of the state, leaving the phase intact.
  /// Returns `None` if the outcome was already consumed.
  pub(super) fn take_outcome(&mut self) -> Option<Outcome<T>> {
    match &mut self.state {
      State::Resolved(slot) => slot.take().map(Ok),
      State::Rejected(slot) => slot.take().map(Err),
      State::Pending | State::Cancelled => None,
    }
  }

  pub(super) fn state_name(&self) -> &'static str {
    match self.phase() {
      Phase::Pending => "Pending",
      Phase::Resolved => "Resolved",
      Phase::Rejected => "Rejected",
      Phase::Cancelled => "Cancelled",
    }
  }
}

impl<T> fmt::Debug for DeferredCore<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DeferredCore")
      .field("state", &self.state_name())
      .field("has_continuation", &self.continuation.is_some())
      .finish()
  }
}
