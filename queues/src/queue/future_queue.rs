//! A bounded producer/consumer queue with a capped backlog of waiting
//! consumers.

use crate::deferred::Deferred;
use crate::error::UnderflowError;

use log::{debug, trace};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Result of a [`BoundedFutureQueue::shift`]: an item served synchronously
/// from the buffer, or a deferred that resolves with a later-pushed value.
#[derive(Debug)]
pub enum Shifted<T> {
  /// The buffer held data; here is the oldest item.
  Item(T),
  /// The buffer was empty; the deferred resolves with the next pushed value
  /// once every earlier-registered consumer has been served.
  Pending(Deferred<T>),
}

impl<T> Shifted<T> {
  /// The item, if one was served synchronously.
  pub fn item(self) -> Option<T> {
    match self {
      Shifted::Item(value) => Some(value),
      Shifted::Pending(_) => None,
    }
  }

  /// The deferred, if the call registered a waiting consumer.
  pub fn pending(self) -> Option<Deferred<T>> {
    match self {
      Shifted::Item(_) => None,
      Shifted::Pending(deferred) => Some(deferred),
    }
  }
}

struct FutureQueueCore<T> {
  max_size: usize,
  backlog: usize,
  buffer: VecDeque<T>,
  waiting_consumers: VecDeque<Deferred<T>>,
  // Each blocked push holds its value beside its deferred; the value enters
  // the buffer only when a shift frees room.
  waiting_producers: VecDeque<(Deferred<()>, T)>,
}

impl<T> FutureQueueCore<T> {
  fn prune_consumers(&mut self) {
    self.waiting_consumers.retain(|consumer| consumer.is_pending());
  }

  // Admits the oldest still-pending blocked producer if the buffer has room,
  // moving its value into the buffer. A cancelled producer's value is
  // dropped without ever entering the buffer.
  fn admit_producer(&mut self) -> Option<Deferred<()>> {
    while self.buffer.len() < self.max_size {
      match self.waiting_producers.pop_front() {
        Some((producer, value)) => {
          if producer.is_pending() {
            self.buffer.push_back(value);
            return Some(producer);
          }
        }
        None => break,
      }
    }
    None
  }
}

/// A bounded producer/consumer queue.
///
/// Producers are backpressured once the buffer holds `max_size` items: the
/// blocked push's value waits beside its deferred and is admitted,
/// oldest-first, as removals free room. Consumers finding the buffer empty
/// may wait — up to `backlog` of them at once; past that, `shift` fails
/// synchronously with [`UnderflowError`]. A push always serves the
/// longest-waiting consumer directly, bypassing the buffer.
///
/// Clones share the same queue.
pub struct BoundedFutureQueue<T> {
  core: Rc<RefCell<FutureQueueCore<T>>>,
}

impl<T> Clone for BoundedFutureQueue<T> {
  fn clone(&self) -> Self {
    BoundedFutureQueue {
      core: Rc::clone(&self.core),
    }
  }
}

impl<T> BoundedFutureQueue<T> {
  /// Creates a queue buffering up to `max_size` items with at most `backlog`
  /// simultaneously waiting consumers. Panics if either bound is zero.
  pub fn new(max_size: usize, backlog: usize) -> Self {
    assert!(max_size > 0, "BoundedFutureQueue max_size must be positive");
    assert!(backlog > 0, "BoundedFutureQueue backlog must be positive");
    BoundedFutureQueue {
      core: Rc::new(RefCell::new(FutureQueueCore {
        max_size,
        backlog,
        buffer: VecDeque::new(),
        waiting_consumers: VecDeque::new(),
        waiting_producers: VecDeque::new(),
      })),
    }
  }

  /// Pushes one value.
  ///
  /// Serves the oldest waiting consumer directly if one exists, or buffers
  /// the value if there is room; both return `None`. With the buffer full,
  /// returns a pending [`Deferred`] that resolves once the value has been
  /// admitted to the buffer by a later removal.
  pub fn push(&self, value: T) -> Option<Deferred<()>> {
    enum Action<T> {
      HandOff(Deferred<T>, T),
      Buffered,
      Blocked(Deferred<()>),
    }

    let action = {
      let mut core = self.core.borrow_mut();
      core.prune_consumers();
      if let Some(consumer) = core.waiting_consumers.pop_front() {
        debug_assert!(
          core.buffer.is_empty(),
          "waiting consumers alongside buffered items"
        );
        Action::HandOff(consumer, value)
      } else if core.buffer.len() < core.max_size {
        core.buffer.push_back(value);
        Action::Buffered
      } else {
        let deferred = Deferred::new();
        core.waiting_producers.push_back((deferred.clone(), value));
        trace!(
          "future queue buffer full at {}: push blocked ({} waiting producers)",
          core.max_size,
          core.waiting_producers.len()
        );
        Action::Blocked(deferred)
      }
    };

    match action {
      Action::HandOff(consumer, value) => {
        consumer.resolve(value);
        None
      }
      Action::Buffered => None,
      Action::Blocked(deferred) => Some(deferred),
    }
  }

  /// Removes the oldest item, or registers a waiting consumer.
  ///
  /// With data buffered, returns it synchronously as [`Shifted::Item`] —
  /// admitting (and resolving) the oldest blocked producer if the removal
  /// freed room. With the buffer empty, returns [`Shifted::Pending`] while
  /// fewer than `backlog` consumers wait; past that the call fails with
  /// [`UnderflowError`] — a hard cap on concurrent demand, not
  /// backpressure.
  pub fn shift(&self) -> Result<Shifted<T>, UnderflowError> {
    let (shifted, admitted) = {
      let mut core = self.core.borrow_mut();
      if let Some(value) = core.buffer.pop_front() {
        let admitted = core.admit_producer();
        (Shifted::Item(value), admitted)
      } else {
        core.prune_consumers();
        if core.waiting_consumers.len() >= core.backlog {
          debug!("future queue consumer backlog saturated at {}", core.backlog);
          return Err(UnderflowError);
        }
        let deferred = Deferred::new();
        core.waiting_consumers.push_back(deferred.clone());
        (Shifted::Pending(deferred), None)
      }
    };
    if let Some(producer) = admitted {
      producer.resolve(());
    }
    Ok(shifted)
  }

  /// Number of items currently buffered (excludes values held by blocked
  /// producers).
  pub fn len(&self) -> usize {
    self.core.borrow().buffer.len()
  }

  /// Whether the buffer is empty.
  pub fn is_empty(&self) -> bool {
    self.core.borrow().buffer.is_empty()
  }

  /// Whether the buffer is at capacity.
  pub fn is_full(&self) -> bool {
    let core = self.core.borrow();
    core.buffer.len() >= core.max_size
  }
}

impl<T> fmt::Debug for BoundedFutureQueue<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let core = self.core.borrow();
    f.debug_struct("BoundedFutureQueue")
      .field("max_size", &core.max_size)
      .field("backlog", &core.backlog)
      .field("len", &core.buffer.len())
      .field("waiting_consumers", &core.waiting_consumers.len())
      .field("waiting_producers", &core.waiting_producers.len())
      .finish()
  }
}
