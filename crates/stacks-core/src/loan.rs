//! Loans and return receipts.
//!
//! A loan is opened ACTIVE at checkout and closed exactly once, either as
//! RETURNED or as LOST. OVERDUE is never stored: it is what an ACTIVE loan
//! looks like once its due date has passed (see [`Loan::observed_status`]).

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
  error::BusinessRule,
  id::{BookId, CopyId, FineId, LoanId, MemberId, ReservationId},
};

/// Longest period a single checkout or renewal may run.
pub const MAX_PERIOD_DAYS: u32 = 365;

/// The date `period_days` after `from`, for a period in
/// `1..=MAX_PERIOD_DAYS` that stays inside the calendar.
pub fn due_after(from: NaiveDate, period_days: u32) -> Result<NaiveDate, BusinessRule> {
  if !(1..=MAX_PERIOD_DAYS).contains(&period_days) {
    return Err(BusinessRule::InvalidLoanPeriod);
  }
  from
    .checked_add_days(Days::new(u64::from(period_days)))
    .ok_or(BusinessRule::InvalidLoanPeriod)
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
pub enum LoanStatus {
  Active,
  Overdue,
  Returned,
  Lost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
  pub loan_id:       LoanId,
  pub member_id:     MemberId,
  pub copy_id:       CopyId,
  /// Denormalised from the copy so returns can lock the book's queue without
  /// another lookup.
  pub book_id:       BookId,
  pub checkout_date: NaiveDate,
  pub due_date:      NaiveDate,
  pub return_date:   Option<NaiveDate>,
  pub status:        LoanStatus,
  pub renewal_count: u32,
}

impl Loan {
  /// Open a new ACTIVE loan due `period_days` after `today`.
  pub fn open(
    member_id: MemberId,
    copy_id: CopyId,
    book_id: BookId,
    today: NaiveDate,
    period_days: u32,
  ) -> Result<Self, BusinessRule> {
    Ok(Self {
      loan_id: LoanId::new(),
      member_id,
      copy_id,
      book_id,
      checkout_date: today,
      due_date: due_after(today, period_days)?,
      return_date: None,
      status: LoanStatus::Active,
      renewal_count: 0,
    })
  }

  pub fn is_active(&self) -> bool { self.status == LoanStatus::Active }

  /// ACTIVE loans past their due date are reported as OVERDUE.
  pub fn observed_status(&self, today: NaiveDate) -> LoanStatus {
    if self.is_active() && today > self.due_date {
      LoanStatus::Overdue
    } else {
      self.status
    }
  }

  /// Whole days past the due date on `day`; zero when on time.
  pub fn overdue_days(&self, day: NaiveDate) -> i64 {
    (day - self.due_date).num_days().max(0)
  }

  /// Push the due date out by another period. The loan is left untouched
  /// when the period is refused.
  pub fn renew(&mut self, period_days: u32) -> Result<(), BusinessRule> {
    self.due_date = due_after(self.due_date, period_days)?;
    self.renewal_count += 1;
    Ok(())
  }

  pub fn close_returned(&mut self, today: NaiveDate) {
    self.status = LoanStatus::Returned;
    self.return_date = Some(today);
  }

  pub fn close_lost(&mut self) { self.status = LoanStatus::Lost; }
}

// ─── Receipt ─────────────────────────────────────────────────────────────────

/// What the member gets back when a loan is returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
  pub loan_id:      LoanId,
  pub member_id:    MemberId,
  pub copy_id:      CopyId,
  pub returned_on:  NaiveDate,
  pub days_overdue: i64,
  /// Zero when the copy came back on time.
  pub fine_charged: Decimal,
  pub fine_id:      Option<FineId>,
  /// Set when the copy went straight to the next member in the queue.
  pub held_for:     Option<ReservationId>,
  pub description:  String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, d).unwrap() }

  fn loan_on(d: u32) -> Loan {
    Loan::open(MemberId::new(), CopyId::new(), BookId::new(), day(d), 14).unwrap()
  }

  #[test]
  fn open_sets_due_date_from_period() {
    let loan = loan_on(1);
    assert_eq!(loan.due_date, day(15));
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(loan.renewal_count, 0);
    assert!(loan.return_date.is_none());
  }

  #[test]
  fn overdue_is_observed_not_stored() {
    let loan = loan_on(1);
    assert_eq!(loan.observed_status(day(15)), LoanStatus::Active);
    assert_eq!(loan.observed_status(day(16)), LoanStatus::Overdue);
    assert_eq!(loan.status, LoanStatus::Active);
  }

  #[test]
  fn overdue_days_never_negative() {
    let loan = loan_on(1);
    assert_eq!(loan.overdue_days(day(4)), 0);
    assert_eq!(loan.overdue_days(day(15)), 0);
    assert_eq!(loan.overdue_days(day(18)), 3);
  }

  #[test]
  fn renew_extends_from_current_due_date() {
    let mut loan = loan_on(1);
    loan.renew(14).unwrap();
    assert_eq!(loan.due_date, day(29));
    assert_eq!(loan.renewal_count, 1);
  }

  #[test]
  fn periods_outside_the_calendar_are_refused() {
    let open = |period| Loan::open(MemberId::new(), CopyId::new(), BookId::new(), day(1), period);
    assert_eq!(open(0).unwrap_err(), BusinessRule::InvalidLoanPeriod);
    assert_eq!(open(MAX_PERIOD_DAYS + 1).unwrap_err(), BusinessRule::InvalidLoanPeriod);
    assert_eq!(open(u32::MAX).unwrap_err(), BusinessRule::InvalidLoanPeriod);
    assert_eq!(open(MAX_PERIOD_DAYS).unwrap().due_date, day(1) + Days::new(365));
  }

  #[test]
  fn renewal_past_the_end_of_the_calendar_changes_nothing() {
    let mut loan = loan_on(1);
    loan.due_date = NaiveDate::MAX;
    assert_eq!(loan.renew(14).unwrap_err(), BusinessRule::InvalidLoanPeriod);
    assert_eq!(loan.due_date, NaiveDate::MAX);
    assert_eq!(loan.renewal_count, 0);
  }
}
