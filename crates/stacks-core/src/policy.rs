//! Circulation policy knobs.
//!
//! Every field has a default so a config file only needs to name what it
//! overrides.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CirculationPolicy {
  pub loan_period_days:     u32,
  pub max_renewals:         u32,
  /// Overdue fine per day, in currency units.
  pub daily_rate:           Decimal,
  pub max_loans_per_member: usize,
  /// Days a member has to pay a fine.
  pub fine_due_days:        u32,
  /// Replacement charge for a copy lost while on loan.
  pub lost_item_charge:     Decimal,
  /// How long an operation waits for a busy copy, member or book before
  /// giving up with a concurrency conflict.
  pub lock_timeout_ms:      u64,
}

impl CirculationPolicy {
  pub fn lock_timeout(&self) -> Duration {
    Duration::from_millis(self.lock_timeout_ms)
  }
}

impl Default for CirculationPolicy {
  fn default() -> Self {
    Self {
      loan_period_days:     14,
      max_renewals:         2,
      daily_rate:           Decimal::new(25, 2),
      max_loans_per_member: 5,
      fine_due_days:        30,
      lost_item_charge:     Decimal::new(2500, 2),
      lock_timeout_ms:      5_000,
    }
  }
}
