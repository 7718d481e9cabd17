#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! Test doubles for weir's time utilities.
//!
//! [`ManualTimer`] implements [`weir::time::Timer`] with a virtual clock
//! that only moves when the test says so, making delay, timeout, and
//! backoff behaviour fully deterministic. It also records every requested
//! delay so tests can assert on the exact sleeps a component asked for.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use weir::time::{sleep, DelayOutcome};
//! use weir_testing::ManualTimer;
//!
//! let timer = ManualTimer::new();
//! let delay = sleep(&timer, Duration::from_secs(5));
//!
//! timer.advance(Duration::from_secs(5));
//! assert_eq!(delay.deferred().try_take(), Some(Ok(DelayOutcome::Elapsed)));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use weir::time::{ScheduledCall, Timer};

struct Entry {
  id: u64,
  due: Duration,
  call: Box<dyn FnOnce()>,
}

struct TimerInner {
  now: Duration,
  next_id: u64,
  entries: Vec<Entry>,
  requested: Vec<Duration>,
}

/// A deterministic [`Timer`] driven by [`advance`](ManualTimer::advance).
///
/// Due calls fire in due order (ties in scheduling order), each after the
/// virtual clock has moved to its due time, so a fired call may schedule
/// further calls and they too will fire within the same `advance` if due.
///
/// Clones share the same clock.
pub struct ManualTimer {
  inner: Rc<RefCell<TimerInner>>,
}

impl ManualTimer {
  /// Creates a timer at virtual time zero with nothing scheduled.
  pub fn new() -> Self {
    ManualTimer {
      inner: Rc::new(RefCell::new(TimerInner {
        now: Duration::ZERO,
        next_id: 0,
        entries: Vec::new(),
        requested: Vec::new(),
      })),
    }
  }

  /// Current virtual time.
  pub fn now(&self) -> Duration {
    self.inner.borrow().now
  }

  /// Number of scheduled calls that have neither fired nor been cancelled.
  pub fn pending(&self) -> usize {
    self.inner.borrow().entries.len()
  }

  /// Every delay ever requested of this timer, in request order — fired,
  /// cancelled, or still pending alike.
  pub fn requested(&self) -> Vec<Duration> {
    self.inner.borrow().requested.clone()
  }

  /// Moves the virtual clock forward by `by`, firing every call that comes
  /// due along the way.
  pub fn advance(&self, by: Duration) {
    let target = self.inner.borrow().now + by;
    loop {
      // One due entry per pass; the borrow is released before the call runs
      // so the call may schedule or cancel freely.
      let next = {
        let mut inner = self.inner.borrow_mut();
        let due_idx = inner
          .entries
          .iter()
          .enumerate()
          .filter(|(_, entry)| entry.due <= target)
          .min_by_key(|(_, entry)| (entry.due, entry.id))
          .map(|(idx, _)| idx);
        match due_idx {
          Some(idx) => {
            let entry = inner.entries.remove(idx);
            if entry.due > inner.now {
              inner.now = entry.due;
            }
            Some(entry.call)
          }
          None => {
            inner.now = target;
            None
          }
        }
      };
      match next {
        Some(call) => call(),
        None => break,
      }
    }
  }
}

impl Clone for ManualTimer {
  fn clone(&self) -> Self {
    ManualTimer {
      inner: Rc::clone(&self.inner),
    }
  }
}

impl Default for ManualTimer {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for ManualTimer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let inner = self.inner.borrow();
    f.debug_struct("ManualTimer")
      .field("now", &inner.now)
      .field("pending", &inner.entries.len())
      .finish()
  }
}

impl Timer for ManualTimer {
  fn schedule(&self, after: Duration, call: Box<dyn FnOnce()>) -> ScheduledCall {
    let id = {
      let mut inner = self.inner.borrow_mut();
      let id = inner.next_id;
      inner.next_id += 1;
      let due = inner.now + after;
      inner.requested.push(after);
      inner.entries.push(Entry { id, due, call });
      id
    };
    let weak: Weak<RefCell<TimerInner>> = Rc::downgrade(&self.inner);
    ScheduledCall::new(move || {
      if let Some(inner) = weak.upgrade() {
        inner.borrow_mut().entries.retain(|entry| entry.id != id);
      }
    })
  }
}
