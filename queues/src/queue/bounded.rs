//! A fixed-capacity FIFO queue that backpressures producers instead of
//! rejecting them.

use crate::deferred::Deferred;
use crate::error::UnderflowError;

use log::trace;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

struct BoundedCore<T> {
  capacity: usize,
  items: VecDeque<T>,
  pending_pushers: VecDeque<Deferred<()>>,
}

impl<T> BoundedCore<T> {
  // Drains every pending pusher once the queue is back under capacity. The
  // caller resolves the returned deferreds after releasing the borrow.
  fn release(&mut self) -> Vec<Deferred<()>> {
    if self.items.len() < self.capacity && !self.pending_pushers.is_empty() {
      trace!(
        "bounded queue at {} of {}: releasing {} pending pushers",
        self.items.len(),
        self.capacity,
        self.pending_pushers.len()
      );
      self.pending_pushers.drain(..).collect()
    } else {
      Vec::new()
    }
  }
}

/// A bounded FIFO queue with backpressure.
///
/// Pushing never rejects or truncates: the queue is allowed to grow past its
/// capacity, and any push that leaves it full returns a [`Deferred`] that
/// resolves once enough removals bring the length back under capacity.
/// Pending pushers resolve in FIFO registration order, synchronously, inside
/// the `shift`/`shift_many` call that made room.
///
/// Clones share the same queue.
pub struct BoundedQueue<T> {
  core: Rc<RefCell<BoundedCore<T>>>,
}

impl<T> Clone for BoundedQueue<T> {
  fn clone(&self) -> Self {
    BoundedQueue {
      core: Rc::clone(&self.core),
    }
  }
}

impl<T> BoundedQueue<T> {
  /// Creates a queue holding up to `capacity` items before backpressure
  /// engages. Panics if `capacity` is zero.
  pub fn new(capacity: usize) -> Self {
    assert!(capacity > 0, "BoundedQueue capacity must be positive");
    BoundedQueue {
      core: Rc::new(RefCell::new(BoundedCore {
        capacity,
        items: VecDeque::new(),
        pending_pushers: VecDeque::new(),
      })),
    }
  }

  /// Appends one value. See [`push_many`](BoundedQueue::push_many).
  pub fn push(&self, value: T) -> Option<Deferred<()>> {
    self.push_many(std::iter::once(value))
  }

  /// Appends each value in order, always accepting all of them.
  ///
  /// Returns `None` if the queue stayed under capacity, or a pending
  /// [`Deferred`] that resolves (with no payload) once later removals bring
  /// the queue back under capacity. Distinct calls receive distinct
  /// deferreds.
  pub fn push_many<I>(&self, values: I) -> Option<Deferred<()>>
  where
    I: IntoIterator<Item = T>,
  {
    let mut core = self.core.borrow_mut();
    core.items.extend(values);
    if core.items.len() >= core.capacity {
      let deferred = Deferred::new();
      core.pending_pushers.push_back(deferred.clone());
      trace!(
        "bounded queue full at {} of {}: push deferred",
        core.items.len(),
        core.capacity
      );
      Some(deferred)
    } else {
      None
    }
  }

  /// Removes and returns the oldest item.
  ///
  /// Any pending pushers whose backpressure has lifted resolve before this
  /// call returns.
  pub fn shift(&self) -> Result<T, UnderflowError> {
    let (value, released) = {
      let mut core = self.core.borrow_mut();
      let value = core.items.pop_front().ok_or(UnderflowError)?;
      (value, core.release())
    };
    for pusher in released {
      pusher.resolve(());
    }
    Ok(value)
  }

  /// Removes and returns the oldest `n` items in insertion order.
  ///
  /// Fails with [`UnderflowError`] — removing nothing — if fewer than `n`
  /// items are buffered.
  pub fn shift_many(&self, n: usize) -> Result<Vec<T>, UnderflowError> {
    let (values, released) = {
      let mut core = self.core.borrow_mut();
      if n > core.items.len() {
        return Err(UnderflowError);
      }
      let values: Vec<T> = core.items.drain(..n).collect();
      (values, core.release())
    };
    for pusher in released {
      pusher.resolve(());
    }
    Ok(values)
  }

  /// Whether the queue is at or over capacity.
  pub fn is_full(&self) -> bool {
    let core = self.core.borrow();
    core.items.len() >= core.capacity
  }

  /// Current buffered count, including any over-capacity surplus held for
  /// pending pushers.
  pub fn len(&self) -> usize {
    self.core.borrow().items.len()
  }

  /// Whether nothing is buffered.
  pub fn is_empty(&self) -> bool {
    self.core.borrow().items.is_empty()
  }

  /// The fixed capacity this queue was created with.
  pub fn capacity(&self) -> usize {
    self.core.borrow().capacity
  }
}

impl<T> fmt::Debug for BoundedQueue<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let core = self.core.borrow();
    f.debug_struct("BoundedQueue")
      .field("capacity", &core.capacity)
      .field("len", &core.items.len())
      .field("pending_pushers", &core.pending_pushers.len())
      .finish()
  }
}
