// gavel/src/clock.rs

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Time source seam. Sweeps and window checks take their notion of "now"
/// from here so tests can drive the clock instead of sleeping.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// A settable clock for tests and demos.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<RwLock<DateTime<Utc>>>);

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    ManualClock(Arc::new(RwLock::new(start)))
  }

  pub fn set(&self, now: DateTime<Utc>) {
    *self.0.write() = now;
  }

  pub fn advance(&self, by: Duration) {
    let mut guard = self.0.write();
    *guard += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.0.read()
  }
}
