//! Library accounts.
//!
//! Borrowers, staff and administrators share one account record tagged with
//! a role. Circulation only cares about the borrower capability: identity,
//! fine balance, and ownership of loans and reservations (by id).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::id::MemberId;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccountRole {
  Borrower,
  Staff,
  Administrator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub member_id:    MemberId,
  pub name:         String,
  pub role:         AccountRole,
  pub joined_on:    NaiveDate,
  /// Sum of outstanding PENDING fines. Written only by the fine ledger.
  pub fine_balance: Decimal,
}

impl Account {
  pub fn new(name: impl Into<String>, role: AccountRole, joined_on: NaiveDate) -> Self {
    Self {
      member_id: MemberId::new(),
      name: name.into(),
      role,
      joined_on,
      fine_balance: Decimal::ZERO,
    }
  }

  pub fn can_borrow(&self) -> bool { self.role == AccountRole::Borrower }
}
