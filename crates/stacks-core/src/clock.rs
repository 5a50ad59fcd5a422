//! Time source for the circulation core.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Days, NaiveDate, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;

  fn today(&self) -> NaiveDate { self.now().date_naive() }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to. Used by tests and replays.
#[derive(Debug)]
pub struct FixedClock {
  now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
  pub fn new(now: DateTime<Utc>) -> Self { Self { now: RwLock::new(now) } }

  /// Move the clock forward by whole days.
  pub fn advance_days(&self, days: u64) {
    let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
    *now = *now + Days::new(days);
  }

  pub fn set(&self, to: DateTime<Utc>) {
    *self.now.write().unwrap_or_else(PoisonError::into_inner) = to;
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.read().unwrap_or_else(PoisonError::into_inner)
  }
}
