//! Fines: the member's ledger entries.
//!
//! Fines are never deleted. Payments are recorded against them through
//! `amount_paid`; a fine only counts toward the member's balance while it is
//! PENDING.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::id::{FineId, LoanId, MemberId};

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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FineReason {
  Overdue,
  DamagedItem,
  LostItem,
  Administrative,
}

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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FineStatus {
  Pending,
  Paid,
  Waived,
  Disputed,
}

impl FineStatus {
  /// PAID and WAIVED fines are final.
  pub fn is_settled(self) -> bool { matches!(self, Self::Paid | Self::Waived) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fine {
  pub fine_id:     FineId,
  pub member_id:   MemberId,
  pub loan_id:     Option<LoanId>,
  pub amount:      Decimal,
  pub amount_paid: Decimal,
  pub reason:      FineReason,
  pub issue_date:  NaiveDate,
  pub due_date:    NaiveDate,
  pub status:      FineStatus,
  /// Dispute reason or other staff note.
  pub note:        Option<String>,
  /// Server-assigned; orders fines issued on the same day.
  pub recorded_at: DateTime<Utc>,
}

impl Fine {
  /// A new PENDING fine, payable within `due_days`.
  pub fn issue(
    member_id: MemberId,
    loan_id: Option<LoanId>,
    reason: FineReason,
    amount: Decimal,
    now: DateTime<Utc>,
    due_days: u32,
  ) -> Self {
    let issue_date = now.date_naive();
    Self {
      fine_id: FineId::new(),
      member_id,
      loan_id,
      amount,
      amount_paid: Decimal::ZERO,
      reason,
      issue_date,
      due_date: issue_date + Days::new(u64::from(due_days)),
      status: FineStatus::Pending,
      note: None,
      recorded_at: now,
    }
  }

  /// What is still owed on this fine.
  pub fn outstanding(&self) -> Decimal { self.amount - self.amount_paid }

  /// The share of this fine that belongs in the member's balance.
  pub fn balance_share(&self) -> Decimal {
    if self.status == FineStatus::Pending {
      self.outstanding()
    } else {
      Decimal::ZERO
    }
  }
}

/// Sum of what is owed across PENDING fines.
pub fn outstanding_total<'a>(fines: impl IntoIterator<Item = &'a Fine>) -> Decimal {
  fines.into_iter().map(Fine::balance_share).sum()
}
