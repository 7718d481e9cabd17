use super::{ScheduledCall, Timer};

use std::time::Duration;

/// [`Timer`] backed by the tokio runtime's timer wheel.
///
/// Scheduled calls run on the current thread via `tokio::task::spawn_local`,
/// so a `TokioTimer` must be used from within a [`tokio::task::LocalSet`] on
/// a current-thread runtime — the single-threaded model the rest of this
/// crate assumes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

impl TokioTimer {
  /// Creates a timer handle; all handles share the ambient runtime.
  pub fn new() -> Self {
    TokioTimer
  }
}

impl Timer for TokioTimer {
  fn schedule(&self, after: Duration, call: Box<dyn FnOnce()>) -> ScheduledCall {
    let handle = tokio::task::spawn_local(async move {
      tokio::time::sleep(after).await;
      call();
    });
    ScheduledCall::new(move || handle.abort())
  }
}
