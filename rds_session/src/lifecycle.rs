use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
  Running,
  Terminating,
  Closed,
}

impl SessionState {
  fn from_u8(val: u8) -> Self {
    match val {
      0 => SessionState::Running,
      1 => SessionState::Terminating,
      _ => SessionState::Closed,
    }
  }
}

/// Shared session state.  Anything holding a reference (input thread, timer, error path) may ask
/// the session to stop; the presentation loop notices between frames and performs the shutdown.
#[derive(Debug)]
pub struct Lifecycle {
  state: AtomicU8,
}

impl Default for Lifecycle {
  fn default() -> Self { Self::new() }
}

impl Lifecycle {
  pub fn new() -> Self {
    Lifecycle {
      state: AtomicU8::new(SessionState::Running as u8),
    }
  }

  pub fn state(&self) -> SessionState { SessionState::from_u8(self.state.load(Ordering::Acquire)) }

  pub fn is_running(&self) -> bool { self.state() == SessionState::Running }

  /// `Running -> Terminating`.  Returns `true` only for the call that performed the transition;
  /// every later call is a no-op.
  pub fn terminate(&self) -> bool {
    self
      .state
      .compare_exchange(
        SessionState::Running as u8,
        SessionState::Terminating as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
      )
      .is_ok()
  }

  /// `Terminating -> Closed`, once shutdown work has finished.  Returns `true` only for the call
  /// that performed the transition.
  pub fn close(&self) -> bool {
    self
      .state
      .compare_exchange(
        SessionState::Terminating as u8,
        SessionState::Closed as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
      )
      .is_ok()
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, thread};

  use super::*;

  #[test]
  fn transitions_once() {
    let lifecycle = Lifecycle::new();
    assert_eq!(lifecycle.state(), SessionState::Running);

    // can't close a running session
    assert!(!lifecycle.close());
    assert_eq!(lifecycle.state(), SessionState::Running);

    assert!(lifecycle.terminate());
    assert!(!lifecycle.terminate());
    assert_eq!(lifecycle.state(), SessionState::Terminating);
    assert!(!lifecycle.is_running());

    assert!(lifecycle.close());
    assert!(!lifecycle.close());
    assert!(!lifecycle.terminate());
    assert_eq!(lifecycle.state(), SessionState::Closed);
  }

  #[test]
  fn concurrent_termination_has_one_winner() {
    let lifecycle = Arc::new(Lifecycle::new());
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let lifecycle = Arc::clone(&lifecycle);
        thread::spawn(move || lifecycle.terminate())
      })
      .collect();
    let winners = handles
      .into_iter()
      .map(|h| h.join().unwrap())
      .filter(|won| *won)
      .count();
    assert_eq!(winners, 1);
    assert_eq!(lifecycle.state(), SessionState::Terminating);
  }
}
