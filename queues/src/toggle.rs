//! A single-fire broadcast event with many observers.

use crate::deferred::Deferred;

use log::trace;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

enum ToggleCore<T> {
  Armed { listeners: Vec<Deferred<T>> },
  Fired(T),
}

/// A single-fire event that can have many observers.
///
/// Each [`listen`](Toggle::listen) call returns a deferred that resolves
/// with the fired result — immediately if the toggle already fired, or at
/// firing time, in registration order. Firing twice is a programming error
/// and panics.
///
/// Clones share the same event.
pub struct Toggle<T> {
  core: Rc<RefCell<ToggleCore<T>>>,
}

impl<T> Clone for Toggle<T> {
  fn clone(&self) -> Self {
    Toggle {
      core: Rc::clone(&self.core),
    }
  }
}

impl<T: Clone> Toggle<T> {
  /// Creates an unfired toggle.
  pub fn new() -> Self {
    Toggle {
      core: Rc::new(RefCell::new(ToggleCore::Armed {
        listeners: Vec::new(),
      })),
    }
  }

  /// Adds a listener, returning a deferred that resolves with the result
  /// the next (and only) time the toggle fires — or immediately, if it
  /// already has.
  pub fn listen(&self) -> Deferred<T> {
    let mut core = self.core.borrow_mut();
    match &mut *core {
      ToggleCore::Armed { listeners } => {
        let deferred = Deferred::new();
        listeners.push(deferred.clone());
        deferred
      }
      ToggleCore::Fired(result) => Deferred::resolved(result.clone()),
    }
  }

  /// Fires the event, resolving every listener in registration order.
  ///
  /// Panics if the toggle already fired.
  pub fn fire(&self, result: T) {
    let listeners = {
      let mut core = self.core.borrow_mut();
      assert!(
        matches!(&*core, ToggleCore::Armed { .. }),
        "toggle already fired"
      );
      match std::mem::replace(&mut *core, ToggleCore::Fired(result.clone())) {
        ToggleCore::Armed { listeners } => listeners,
        ToggleCore::Fired(_) => unreachable!(),
      }
    };
    trace!("toggle fired; resolving {} listeners", listeners.len());
    for listener in listeners {
      listener.resolve(result.clone());
    }
  }

  /// Whether the event has already been fired.
  pub fn has_fired(&self) -> bool {
    matches!(&*self.core.borrow(), ToggleCore::Fired(_))
  }
}

impl<T: Clone> Default for Toggle<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> fmt::Debug for Toggle<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let (state, listeners) = match &*self.core.borrow() {
      ToggleCore::Armed { listeners } => ("Armed", listeners.len()),
      ToggleCore::Fired(_) => ("Fired", 0),
    };
    f.debug_struct("Toggle")
      .field("state", &state)
      .field("listeners", &listeners)
      .finish()
  }
}
