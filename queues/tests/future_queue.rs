use std::cell::RefCell;
use std::rc::Rc;

use weir::{BoundedFutureQueue, Shifted, UnderflowError};

type Log = Rc<RefCell<Vec<String>>>;

// Logs each operation, its synchronous result, and the moment any returned
// deferred fires, so the tests can assert on the exact interleaving of
// hand-offs, admissions, and resolutions.
fn push(q: &BoundedFutureQueue<&'static str>, log: &Log, value: &'static str) {
  log.borrow_mut().push(format!("push {value}"));
  match q.push(value) {
    None => log.borrow_mut().push("result: None".to_string()),
    Some(deferred) => {
      log.borrow_mut().push("result: Deferred".to_string());
      let sink = Rc::clone(log);
      deferred.on_complete(move |_| sink.borrow_mut().push(format!("callback push {value}")));
    }
  }
}

fn shift(q: &BoundedFutureQueue<&'static str>, log: &Log) {
  log.borrow_mut().push("shift".to_string());
  match q.shift() {
    Ok(Shifted::Item(value)) => log.borrow_mut().push(format!("result: {value}")),
    Ok(Shifted::Pending(deferred)) => {
      log.borrow_mut().push("result: Deferred".to_string());
      let sink = Rc::clone(log);
      deferred.on_complete(move |outcome| {
        sink
          .borrow_mut()
          .push(format!("callback shift returned {}", outcome.unwrap()));
      });
    }
    Err(UnderflowError) => log.borrow_mut().push("result: underflow".to_string()),
  }
}

#[test]
fn basics() {
  let log: Log = Rc::new(RefCell::new(Vec::new()));
  let q = BoundedFutureQueue::new(3, 2);

  push(&q, &log, "1");
  push(&q, &log, "2");
  push(&q, &log, "3");
  push(&q, &log, "4");
  for _ in 0..6 {
    shift(&q, &log);
  }
  assert_eq!(q.shift().map(|_| ()), Err(UnderflowError));
  push(&q, &log, "5");
  push(&q, &log, "6");

  assert_eq!(
    *log.borrow(),
    vec![
      "push 1",
      "result: None",
      "push 2",
      "result: None",
      "push 3",
      "result: None",
      // Buffer full: the fourth value waits beside its deferred.
      "push 4",
      "result: Deferred",
      // The removal frees room, so the blocked push is admitted and resolves
      // before shift hands back its value.
      "shift",
      "callback push 4",
      "result: 1",
      "shift",
      "result: 2",
      "shift",
      "result: 3",
      "shift",
      "result: 4",
      "shift",
      "result: Deferred",
      "shift",
      "result: Deferred",
      // The saturated-backlog underflow was asserted directly above; a push
      // now serves the longest-waiting consumer.
      "push 5",
      "callback shift returned 5",
      "result: None",
      "push 6",
      "callback shift returned 6",
      "result: None",
    ]
  );
}

#[test]
fn push_serves_the_oldest_waiting_consumer() {
  let q: BoundedFutureQueue<i32> = BoundedFutureQueue::new(3, 2);

  let first = match q.shift().unwrap() {
    Shifted::Pending(deferred) => deferred,
    Shifted::Item(_) => unreachable!("queue is empty"),
  };
  let second = match q.shift().unwrap() {
    Shifted::Pending(deferred) => deferred,
    Shifted::Item(_) => unreachable!("queue is empty"),
  };

  assert!(q.push(10).is_none());
  assert!(first.is_resolved());
  assert!(second.is_pending());
  assert_eq!(first.try_take(), Some(Ok(10)));

  assert!(q.push(20).is_none());
  assert_eq!(second.try_take(), Some(Ok(20)));
  assert!(q.is_empty());
}

#[test]
fn backlog_saturation_underflows_without_blocking() {
  let q: BoundedFutureQueue<i32> = BoundedFutureQueue::new(1, 1);

  let waiting = q.shift().unwrap().pending().expect("registers a consumer");
  assert!(waiting.is_pending());
  assert_eq!(q.shift().map(|_| ()), Err(UnderflowError));
}

#[test]
fn cancelled_consumer_frees_a_backlog_slot() {
  let q: BoundedFutureQueue<i32> = BoundedFutureQueue::new(1, 1);

  let stale = q.shift().unwrap().pending().expect("registers a consumer");
  assert_eq!(q.shift().map(|_| ()), Err(UnderflowError));

  stale.cancel();

  // The cancelled consumer no longer occupies the backlog, and the next
  // push skips it entirely.
  let fresh = q.shift().unwrap().pending().expect("slot freed");
  assert!(q.push(7).is_none());
  assert!(stale.is_cancelled());
  assert_eq!(fresh.try_take(), Some(Ok(7)));
}

#[test]
fn cancelled_producer_value_never_enters_the_buffer() {
  let q: BoundedFutureQueue<i32> = BoundedFutureQueue::new(1, 1);
  assert!(q.push(1).is_none());

  let blocked = q.push(2).expect("buffer full");
  blocked.cancel();

  assert!(matches!(q.shift().unwrap(), Shifted::Item(1)));
  // The cancelled push was dropped, not admitted: the buffer is now empty.
  assert!(q.is_empty());
  assert!(matches!(q.shift().unwrap(), Shifted::Pending(_)));
}

#[test]
fn producers_are_admitted_oldest_first() {
  let q = BoundedFutureQueue::new(1, 1);
  assert!(q.push("a").is_none());
  let first = q.push("b").expect("buffer full");
  let second = q.push("c").expect("buffer full");

  assert!(matches!(q.shift().unwrap(), Shifted::Item("a")));
  assert!(first.is_resolved());
  assert!(second.is_pending());

  assert!(matches!(q.shift().unwrap(), Shifted::Item("b")));
  assert!(second.is_resolved());
  assert!(matches!(q.shift().unwrap(), Shifted::Item("c")));
}

#[test]
fn dropping_the_queue_abandons_pending_deferreds() {
  let q: BoundedFutureQueue<i32> = BoundedFutureQueue::new(1, 1);
  let waiting = q.shift().unwrap().pending().expect("registers a consumer");

  // No resolution, no rejection: a dropped queue simply never completes the
  // deferreds it still held.
  drop(q);
  assert!(waiting.is_pending());
}

#[test]
fn hand_off_continuation_may_reenter_the_queue() {
  let q: BoundedFutureQueue<i32> = BoundedFutureQueue::new(2, 1);
  let waiting = q.shift().unwrap().pending().expect("registers a consumer");

  let reentrant = q.clone();
  let echoed = Rc::new(RefCell::new(Vec::new()));
  let sink = Rc::clone(&echoed);
  waiting.on_complete(move |outcome| {
    let value = outcome.unwrap();
    sink.borrow_mut().push(value);
    // Push the value straight back while the original push is still on the
    // stack; the queue state is already consistent.
    assert!(reentrant.push(value + 1).is_none());
  });

  assert!(q.push(5).is_none());
  assert_eq!(*echoed.borrow(), vec![5]);
  assert_eq!(q.len(), 1);
  assert!(matches!(q.shift().unwrap(), Shifted::Item(6)));
}
