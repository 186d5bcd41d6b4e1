//! Foreground/background signal from the host environment.

use tokio::sync::watch;
use tracing::debug;

/// Latest host state plus a count of every return to the foreground.
///
/// A `watch` receiver only sees the newest value, so a quick
/// background/foreground flip would look like no change at all. Watchers
/// compare `returns` instead of the flag to catch every return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
  pub foreground: bool,
  pub returns: u64,
}

/// Pushes "is the application in the foreground" to any number of watchers.
///
/// Repeated reports of the same state do not wake watchers.
#[derive(Debug)]
pub struct ActivitySignal {
  tx: watch::Sender<Activity>,
}

impl ActivitySignal {
  pub fn new(foreground: bool) -> Self {
    let (tx, _rx) = watch::channel(Activity {
      foreground,
      returns: 0,
    });
    Self { tx }
  }

  pub fn subscribe(&self) -> watch::Receiver<Activity> {
    self.tx.subscribe()
  }

  pub fn is_foreground(&self) -> bool {
    self.tx.borrow().foreground
  }

  pub fn set_foreground(&self, foreground: bool) {
    let changed = self.tx.send_if_modified(|current| {
      if current.foreground == foreground {
        return false;
      }
      current.foreground = foreground;
      if foreground {
        current.returns += 1;
      }
      true
    });
    if changed {
      debug!(foreground, "host activity changed");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_repeated_state_does_not_notify() {
    let signal = ActivitySignal::new(true);
    let mut rx = signal.subscribe();

    signal.set_foreground(true);
    assert!(!rx.has_changed().unwrap());

    signal.set_foreground(false);
    assert!(rx.has_changed().unwrap());
    assert!(!rx.borrow_and_update().foreground);
    assert!(!signal.is_foreground());
  }

  #[tokio::test]
  async fn test_quick_flip_still_counts_a_return() {
    let signal = ActivitySignal::new(true);
    let mut rx = signal.subscribe();

    signal.set_foreground(false);
    signal.set_foreground(true);
    signal.set_foreground(false);
    signal.set_foreground(true);

    assert!(rx.has_changed().unwrap());
    assert_eq!(
      *rx.borrow_and_update(),
      Activity {
        foreground: true,
        returns: 2
      }
    );
  }

  #[tokio::test]
  async fn test_receivers_see_close() {
    let signal = ActivitySignal::new(false);
    let mut rx = signal.subscribe();
    drop(signal);
    assert!(rx.changed().await.is_err());
  }
}
