use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::api::FetchError;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal gained (true) or lost (false) focus
  Focus(bool),
  /// Periodic tick for UI refresh
  Tick,
  /// Background work finished
  Session(SessionEvent),
}

/// Results of background session work reported back to the UI loop
#[derive(Debug)]
pub enum SessionEvent {
  Refreshed { failed: usize },
  Enrolled { plan: String, cached: bool },
  EnrollFailed { plan: String, error: FetchError },
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let input_tx = tx.clone();

    // Spawn terminal event reader
    tokio::spawn(async move {
      loop {
        if event::poll(tick_rate).unwrap_or(false) {
          if let Ok(evt) = event::read() {
            let forwarded = match evt {
              CrosstermEvent::Key(key) => Some(Event::Key(key)),
              CrosstermEvent::FocusGained => Some(Event::Focus(true)),
              CrosstermEvent::FocusLost => Some(Event::Focus(false)),
              _ => None,
            };
            if let Some(evt) = forwarded {
              if input_tx.send(evt).is_err() {
                break;
              }
            }
          }
        } else {
          // Tick
          if input_tx.send(Event::Tick).is_err() {
            break;
          }
        }
      }
    });

    Self { tx, rx }
  }

  /// Sender for background tasks to report back on
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
