//! An unbounded priority queue with asynchronous `get`/`put`.

use crate::deferred::Deferred;

use log::trace;
use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::rc::Rc;

// Heap entry: ordered by rank, then by arrival sequence so that equal ranks
// come out in insertion order.
struct Ranked<T, K> {
  rank: K,
  seq: u64,
  value: T,
}

impl<T, K: Ord> Ord for Ranked<T, K> {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .rank
      .cmp(&other.rank)
      .then_with(|| self.seq.cmp(&other.seq))
  }
}

impl<T, K: Ord> PartialOrd for Ranked<T, K> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl<T, K: Ord> PartialEq for Ranked<T, K> {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl<T, K: Ord> Eq for Ranked<T, K> {}

struct PriorityCore<T, K> {
  heap: BinaryHeap<Reverse<Ranked<T, K>>>,
  waiting_consumers: VecDeque<Deferred<T>>,
  next_seq: u64,
}

/// An unbounded queue serving buffered items in ascending rank order, with
/// FIFO-fair service of waiting consumers.
///
/// The rank of each item is computed by the injected `sort_key` function at
/// insertion time. While consumers are waiting the queue holds no items, so
/// a `put` hands its value to the longest-waiting consumer directly — the
/// ranked structure is bypassed entirely.
///
/// Clones share the same queue.
pub struct PriorityFutureQueue<T, K, F>
where
  K: Ord,
  F: Fn(&T) -> K,
{
  sort_key: Rc<F>,
  core: Rc<RefCell<PriorityCore<T, K>>>,
}

impl<T, K, F> Clone for PriorityFutureQueue<T, K, F>
where
  K: Ord,
  F: Fn(&T) -> K,
{
  fn clone(&self) -> Self {
    PriorityFutureQueue {
      sort_key: Rc::clone(&self.sort_key),
      core: Rc::clone(&self.core),
    }
  }
}

impl<T, K, F> PriorityFutureQueue<T, K, F>
where
  K: Ord,
  F: Fn(&T) -> K,
{
  /// Creates an empty queue ranking items with `sort_key`.
  pub fn new(sort_key: F) -> Self {
    PriorityFutureQueue {
      sort_key: Rc::new(sort_key),
      core: Rc::new(RefCell::new(PriorityCore {
        heap: BinaryHeap::new(),
        waiting_consumers: VecDeque::new(),
        next_seq: 0,
      })),
    }
  }

  /// Inserts a value, or hands it to the longest-waiting consumer.
  ///
  /// The hand-off resolves the consumer's deferred synchronously, before
  /// this call returns, regardless of the value's rank — nothing is
  /// buffered while consumers wait.
  pub fn put(&self, value: T) {
    let hand_off = {
      let mut core = self.core.borrow_mut();
      core.waiting_consumers.retain(|consumer| consumer.is_pending());
      if let Some(consumer) = core.waiting_consumers.pop_front() {
        debug_assert!(
          core.heap.is_empty(),
          "waiting consumers alongside buffered items"
        );
        trace!(
          "priority queue hand-off ({} consumers still waiting)",
          core.waiting_consumers.len()
        );
        Some((consumer, value))
      } else {
        let rank = (*self.sort_key)(&value);
        let seq = core.next_seq;
        core.next_seq += 1;
        core.heap.push(Reverse(Ranked { rank, seq, value }));
        None
      }
    };
    if let Some((consumer, value)) = hand_off {
      consumer.resolve(value);
    }
  }

  /// Returns a deferred for the next item.
  ///
  /// With items buffered, the minimum-rank element (ties by arrival order)
  /// is popped and the returned deferred is already resolved. Otherwise the
  /// deferred joins the FIFO of waiting consumers and resolves on a later
  /// `put`.
  pub fn get(&self) -> Deferred<T> {
    let mut core = self.core.borrow_mut();
    if let Some(Reverse(entry)) = core.heap.pop() {
      Deferred::resolved(entry.value)
    } else {
      let deferred = Deferred::new();
      core.waiting_consumers.push_back(deferred.clone());
      deferred
    }
  }

  /// Number of buffered items.
  pub fn len(&self) -> usize {
    self.core.borrow().heap.len()
  }

  /// Whether no items are buffered.
  pub fn is_empty(&self) -> bool {
    self.core.borrow().heap.is_empty()
  }
}

impl<T, K, F> fmt::Debug for PriorityFutureQueue<T, K, F>
where
  K: Ord,
  F: Fn(&T) -> K,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let core = self.core.borrow();
    f.debug_struct("PriorityFutureQueue")
      .field("len", &core.heap.len())
      .field("waiting_consumers", &core.waiting_consumers.len())
      .finish()
  }
}
