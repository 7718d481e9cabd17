use super::Deferred;
use crate::error::Rejection;

use futures_util::task::noop_waker;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

#[test]
fn resolve_runs_continuation_synchronously() {
  let deferred = Deferred::new();
  let log = Rc::new(RefCell::new(Vec::new()));

  let sink = Rc::clone(&log);
  deferred.on_complete(move |outcome| {
    sink.borrow_mut().push(format!("completed {}", outcome.unwrap()));
  });

  log.borrow_mut().push("before resolve".to_string());
  deferred.resolve(5);
  log.borrow_mut().push("after resolve".to_string());

  assert_eq!(
    *log.borrow(),
    vec!["before resolve", "completed 5", "after resolve"]
  );
  assert!(deferred.is_resolved());
}

#[test]
fn continuation_registered_after_completion_fires_immediately() {
  let deferred = Deferred::resolved(9);
  let seen = Rc::new(Cell::new(0));

  let sink = Rc::clone(&seen);
  deferred.on_complete(move |outcome| sink.set(outcome.unwrap()));
  assert_eq!(seen.get(), 9);
}

#[test]
fn rejection_reaches_the_continuation() {
  let deferred: Deferred<i32> = Deferred::new();
  let seen = Rc::new(Cell::new(None));

  let sink = Rc::clone(&seen);
  deferred.on_complete(move |outcome| sink.set(Some(outcome)));
  deferred.reject(Rejection::TimedOut);

  assert_eq!(seen.get(), Some(Err(Rejection::TimedOut)));
  assert!(deferred.is_rejected());
}

#[test]
#[should_panic(expected = "deferred already completed")]
fn double_resolve_panics() {
  let deferred = Deferred::new();
  deferred.resolve(1);
  deferred.resolve(2);
}

#[test]
#[should_panic(expected = "continuation slot already occupied")]
fn second_continuation_panics() {
  let deferred: Deferred<i32> = Deferred::new();
  deferred.on_complete(|_| {});
  deferred.on_complete(|_| {});
}

#[test]
fn cancel_drops_the_continuation() {
  let deferred: Deferred<i32> = Deferred::new();
  deferred.on_complete(|_| panic!("cancelled continuation must never run"));
  deferred.cancel();

  // Late completion is silently ignored.
  deferred.resolve(3);
  assert!(deferred.is_cancelled());
  assert!(deferred.try_take().is_none());
}

#[test]
fn cancel_is_idempotent() {
  let pending: Deferred<i32> = Deferred::new();
  pending.cancel();
  pending.cancel();
  assert!(pending.is_cancelled());

  // Cancelling after completion leaves the result intact.
  let completed = Deferred::resolved(4);
  completed.cancel();
  assert!(completed.is_resolved());
  assert_eq!(completed.try_take(), Some(Ok(4)));
}

#[test]
fn try_take_consumes_exactly_once() {
  let deferred = Deferred::new();
  assert!(deferred.try_take().is_none());

  deferred.resolve(11);
  assert_eq!(deferred.try_take(), Some(Ok(11)));
  assert_eq!(deferred.try_take(), None);
  assert!(deferred.is_resolved());
}

#[test]
fn clones_share_one_state_machine() {
  let deferred = Deferred::new();
  let observer = deferred.clone();
  assert!(observer.is_pending());

  deferred.resolve("shared");
  assert!(observer.is_resolved());
  assert_eq!(observer.try_take(), Some(Ok("shared")));
}

#[test]
fn poll_pending_then_ready() {
  let waker = noop_waker();
  let mut cx = Context::from_waker(&waker);

  let mut deferred = Deferred::new();
  assert!(matches!(Pin::new(&mut deferred).poll(&mut cx), Poll::Pending));

  deferred.resolve(21);
  assert!(matches!(
    Pin::new(&mut deferred).poll(&mut cx),
    Poll::Ready(Ok(21))
  ));
}

#[test]
fn awaiting_a_cancelled_deferred_yields_cancelled() {
  let deferred: Deferred<i32> = Deferred::new();
  deferred.cancel();
  assert_eq!(
    futures_executor::block_on(deferred),
    Err(Rejection::Cancelled)
  );
}

#[test]
fn resolve_wakes_an_executor_task() {
  use futures_util::task::LocalSpawnExt;

  let mut pool = futures_executor::LocalPool::new();
  let spawner = pool.spawner();

  let deferred: Deferred<i32> = Deferred::new();
  let seen = Rc::new(Cell::new(0));

  let task_deferred = deferred.clone();
  let task_seen = Rc::clone(&seen);
  spawner
    .spawn_local(async move {
      task_seen.set(task_deferred.await.unwrap());
    })
    .unwrap();

  pool.run_until_stalled();
  assert_eq!(seen.get(), 0);

  deferred.resolve(41);
  pool.run();
  assert_eq!(seen.get(), 41);
}
