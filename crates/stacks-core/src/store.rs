//! Store traits the circulation core persists through.
//!
//! The traits are implemented by storage backends (e.g.
//! `stacks-store-sqlite`). The circulation core never assumes anything about
//! the backend beyond these narrow contracts; in particular, backends do not
//! need to provide multi-record transactions. The core serializes access per
//! resource and undoes its own partial writes.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
  account::Account,
  copy::BookCopy,
  fine::Fine,
  id::{BookId, CopyId, FineId, LoanId, MemberId, ReservationId},
  loan::Loan,
  reservation::Reservation,
};

// ─── Loans ───────────────────────────────────────────────────────────────────

pub trait LoanStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert or overwrite a loan by id.
  fn save_loan(
    &self,
    loan: Loan,
  ) -> impl Future<Output = Result<Loan, Self::Error>> + Send + '_;

  fn find_loan(
    &self,
    id: LoanId,
  ) -> impl Future<Output = Result<Option<Loan>, Self::Error>> + Send + '_;

  /// The ACTIVE loan of `copy_id` held by `member_id`, if any.
  fn find_active_loan(
    &self,
    member_id: MemberId,
    copy_id: CopyId,
  ) -> impl Future<Output = Result<Option<Loan>, Self::Error>> + Send + '_;

  /// Every loan the member ever had, newest checkout first.
  fn find_loans_by_member(
    &self,
    member_id: MemberId,
  ) -> impl Future<Output = Result<Vec<Loan>, Self::Error>> + Send + '_;

  /// ACTIVE loans whose due date is before `as_of`.
  fn find_overdue_loans(
    &self,
    as_of: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Loan>, Self::Error>> + Send + '_;
}

// ─── Copies ──────────────────────────────────────────────────────────────────

pub trait BookCopyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn save_copy(
    &self,
    copy: BookCopy,
  ) -> impl Future<Output = Result<BookCopy, Self::Error>> + Send + '_;

  fn find_copy(
    &self,
    id: CopyId,
  ) -> impl Future<Output = Result<Option<BookCopy>, Self::Error>> + Send + '_;

  /// AVAILABLE, non-retired copies of a book, oldest acquisition first.
  fn find_available_copies(
    &self,
    book_id: BookId,
  ) -> impl Future<Output = Result<Vec<BookCopy>, Self::Error>> + Send + '_;

  fn find_copies_by_book(
    &self,
    book_id: BookId,
  ) -> impl Future<Output = Result<Vec<BookCopy>, Self::Error>> + Send + '_;
}

// ─── Members and fines ───────────────────────────────────────────────────────

pub trait MemberFineStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn find_account(
    &self,
    member_id: MemberId,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn save_account(
    &self,
    account: Account,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  fn find_fines_by_member(
    &self,
    member_id: MemberId,
  ) -> impl Future<Output = Result<Vec<Fine>, Self::Error>> + Send + '_;

  fn find_fines_by_loan(
    &self,
    loan_id: LoanId,
  ) -> impl Future<Output = Result<Vec<Fine>, Self::Error>> + Send + '_;

  fn find_fine(
    &self,
    fine_id: FineId,
  ) -> impl Future<Output = Result<Option<Fine>, Self::Error>> + Send + '_;

  /// Insert or overwrite a fine by id.
  fn save_fine(
    &self,
    fine: Fine,
  ) -> impl Future<Output = Result<Fine, Self::Error>> + Send + '_;

  /// The member's stored balance; zero for unknown members.
  fn get_balance(
    &self,
    member_id: MemberId,
  ) -> impl Future<Output = Result<Decimal, Self::Error>> + Send + '_;

  /// Add `delta` (possibly negative) to the stored balance and return the
  /// new value.
  fn update_balance(
    &self,
    member_id: MemberId,
    delta: Decimal,
  ) -> impl Future<Output = Result<Decimal, Self::Error>> + Send + '_;
}

// ─── Reservations ────────────────────────────────────────────────────────────

pub trait ReservationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn save_reservation(
    &self,
    reservation: Reservation,
  ) -> impl Future<Output = Result<Reservation, Self::Error>> + Send + '_;

  fn find_reservation(
    &self,
    id: ReservationId,
  ) -> impl Future<Output = Result<Option<Reservation>, Self::Error>> + Send + '_;

  /// All reservations for a book, in priority order.
  fn find_reservations_by_book(
    &self,
    book_id: BookId,
  ) -> impl Future<Output = Result<Vec<Reservation>, Self::Error>> + Send + '_;

  fn find_reservations_by_member(
    &self,
    member_id: MemberId,
  ) -> impl Future<Output = Result<Vec<Reservation>, Self::Error>> + Send + '_;

  /// The member's PENDING or READY_FOR_PICKUP reservation for a book.
  fn find_open_reservation(
    &self,
    member_id: MemberId,
    book_id: BookId,
  ) -> impl Future<Output = Result<Option<Reservation>, Self::Error>> + Send + '_;

  /// The READY_FOR_PICKUP reservation a copy is set aside for.
  fn find_ready_reservation(
    &self,
    copy_id: CopyId,
  ) -> impl Future<Output = Result<Option<Reservation>, Self::Error>> + Send + '_;

  /// Highest priority number ever assigned for the book, whatever the
  /// reservation's current status.
  fn max_priority(
    &self,
    book_id: BookId,
  ) -> impl Future<Output = Result<Option<u64>, Self::Error>> + Send + '_;
}

// ─── Combined ────────────────────────────────────────────────────────────────

/// A backend that provides every store the circulation desk needs.
pub trait CirculationStore:
  LoanStore + BookCopyStore + MemberFineStore + ReservationStore
{
}

impl<T> CirculationStore for T where
  T: LoanStore + BookCopyStore + MemberFineStore + ReservationStore
{
}
