use chrono::{DateTime, Utc};

/// Time source for freshness checks.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
  now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
  /// Start at the unix epoch so test times read as plain offsets.
  pub fn new() -> Self {
    Self {
      now: std::sync::Mutex::new(at_millis(0)),
    }
  }

  pub fn set_millis(&self, millis: i64) {
    *self.now.lock().unwrap() = at_millis(millis);
  }

  pub fn advance(&self, by: chrono::Duration) {
    *self.now.lock().unwrap() += by;
  }
}

#[cfg(test)]
fn at_millis(millis: i64) -> DateTime<Utc> {
  use chrono::TimeZone;
  Utc.timestamp_millis_opt(millis).unwrap()
}

#[cfg(test)]
impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }
}
