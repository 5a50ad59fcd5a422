//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stacks_core::{
  account::{Account, AccountRole},
  copy::{BookCopy, CopyStatus},
  fine::{Fine, FineReason, FineStatus},
  id::{BookId, MemberId},
  loan::{Loan, LoanStatus},
  reservation::{Reservation, ReservationStatus},
  store::{BookCopyStore, LoanStore, MemberFineStore, ReservationStore},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn day(m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, m, d).unwrap() }

async fn member(s: &SqliteStore) -> Account {
  s.save_account(Account::new("Ada", AccountRole::Borrower, day(1, 1)))
    .await
    .unwrap()
}

async fn copy(s: &SqliteStore, book_id: BookId, acquired_on: NaiveDate) -> BookCopy {
  s.save_copy(BookCopy::acquire(book_id, "good", "A1", acquired_on))
    .await
    .unwrap()
}

// ─── Accounts and balances ───────────────────────────────────────────────────

#[tokio::test]
async fn save_and_find_account() {
  let s = store().await;
  let ada = member(&s).await;

  let found = s.find_account(ada.member_id).await.unwrap().unwrap();
  assert_eq!(found, ada);
  assert_eq!(found.role, AccountRole::Borrower);
}

#[tokio::test]
async fn unknown_member_has_zero_balance() {
  let s = store().await;
  assert_eq!(s.get_balance(MemberId::new()).await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn update_balance_accumulates() {
  let s = store().await;
  let ada = member(&s).await;

  assert_eq!(s.update_balance(ada.member_id, dec!(1.50)).await.unwrap(), dec!(1.50));
  assert_eq!(s.update_balance(ada.member_id, dec!(0.25)).await.unwrap(), dec!(1.75));
  assert_eq!(s.update_balance(ada.member_id, dec!(-1.75)).await.unwrap(), Decimal::ZERO);
  assert_eq!(s.get_balance(ada.member_id).await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn update_balance_of_unknown_member_fails() {
  let s = store().await;
  let err = s.update_balance(MemberId::new(), dec!(1)).await.unwrap_err();
  assert!(matches!(err, Error::MemberNotFound(_)));
}

#[tokio::test]
async fn resaving_an_account_keeps_its_balance() {
  let s = store().await;
  let mut ada = member(&s).await;
  s.update_balance(ada.member_id, dec!(3.00)).await.unwrap();

  ada.name = "Ada L.".into();
  let saved = s.save_account(ada.clone()).await.unwrap();
  assert_eq!(saved.name, "Ada L.");
  assert_eq!(saved.fine_balance, dec!(3.00));
}

// ─── Copies ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn available_copies_skip_retired_and_busy_copies() {
  let s = store().await;
  let book = BookId::new();
  let newer = copy(&s, book, day(3, 1)).await;
  let older = copy(&s, book, day(1, 1)).await;

  let mut busy = copy(&s, book, day(2, 1)).await;
  busy.status = CopyStatus::CheckedOut;
  s.save_copy(busy).await.unwrap();

  let mut retired = copy(&s, book, day(2, 2)).await;
  retired.retired = true;
  s.save_copy(retired).await.unwrap();

  let available = s.find_available_copies(book).await.unwrap();
  let ids: Vec<_> = available.iter().map(|c| c.copy_id).collect();
  assert_eq!(ids, vec![older.copy_id, newer.copy_id]);

  assert_eq!(s.find_copies_by_book(book).await.unwrap().len(), 4);
}

#[tokio::test]
async fn save_copy_overwrites_status() {
  let s = store().await;
  let mut c = copy(&s, BookId::new(), day(1, 1)).await;
  c.status = CopyStatus::InRepair;
  s.save_copy(c.clone()).await.unwrap();

  let found = s.find_copy(c.copy_id).await.unwrap().unwrap();
  assert_eq!(found.status, CopyStatus::InRepair);
}

// ─── Loans ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn loans_by_member_are_newest_first() {
  let s = store().await;
  let ada = member(&s).await;
  let book = BookId::new();
  let c1 = copy(&s, book, day(1, 1)).await;
  let c2 = copy(&s, book, day(1, 1)).await;

  let first = Loan::open(ada.member_id, c1.copy_id, book, day(1, 1), 14).unwrap();
  let second = Loan::open(ada.member_id, c2.copy_id, book, day(2, 1), 14).unwrap();
  s.save_loan(first.clone()).await.unwrap();
  s.save_loan(second.clone()).await.unwrap();

  let loans = s.find_loans_by_member(ada.member_id).await.unwrap();
  assert_eq!(loans, vec![second, first]);
}

#[tokio::test]
async fn overdue_loans_are_strictly_past_due() {
  let s = store().await;
  let ada = member(&s).await;
  let book = BookId::new();
  let c1 = copy(&s, book, day(1, 1)).await;
  let c2 = copy(&s, book, day(1, 1)).await;
  let c3 = copy(&s, book, day(1, 1)).await;

  // Due 1/15.
  let late = Loan::open(ada.member_id, c1.copy_id, book, day(1, 1), 14).unwrap();
  // Due 1/16.
  let due_today = Loan::open(ada.member_id, c2.copy_id, book, day(1, 2), 14).unwrap();
  let mut returned = Loan::open(ada.member_id, c3.copy_id, book, day(1, 1), 14).unwrap();
  returned.close_returned(day(1, 10));

  for loan in [&late, &due_today, &returned] {
    s.save_loan(loan.clone()).await.unwrap();
  }

  let overdue = s.find_overdue_loans(day(1, 16)).await.unwrap();
  assert_eq!(overdue, vec![late]);
}

#[tokio::test]
async fn find_active_loan_ignores_closed_loans() {
  let s = store().await;
  let ada = member(&s).await;
  let book = BookId::new();
  let c = copy(&s, book, day(1, 1)).await;

  let mut loan = Loan::open(ada.member_id, c.copy_id, book, day(1, 1), 14).unwrap();
  s.save_loan(loan.clone()).await.unwrap();
  assert!(s.find_active_loan(ada.member_id, c.copy_id).await.unwrap().is_some());

  loan.close_returned(day(1, 5));
  s.save_loan(loan.clone()).await.unwrap();
  assert!(s.find_active_loan(ada.member_id, c.copy_id).await.unwrap().is_none());

  let stored = s.find_loan(loan.loan_id).await.unwrap().unwrap();
  assert_eq!(stored.status, LoanStatus::Returned);
  assert_eq!(stored.return_date, Some(day(1, 5)));
}

// ─── Fines ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fines_round_trip_money_and_order_by_issue() {
  let s = store().await;
  let ada = member(&s).await;
  let later = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
  let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

  let b = Fine::issue(ada.member_id, None, FineReason::Administrative, dec!(2.00), later, 30);
  let mut a = Fine::issue(ada.member_id, None, FineReason::DamagedItem, dec!(1.25), earlier, 30);
  a.amount_paid = dec!(0.50);
  a.status = FineStatus::Disputed;
  a.note = Some("was already damaged".into());
  s.save_fine(b.clone()).await.unwrap();
  s.save_fine(a.clone()).await.unwrap();

  let fines = s.find_fines_by_member(ada.member_id).await.unwrap();
  assert_eq!(fines, vec![a.clone(), b]);
  assert_eq!(s.find_fine(a.fine_id).await.unwrap().unwrap().outstanding(), dec!(0.75));
}

#[tokio::test]
async fn fines_by_loan() {
  let s = store().await;
  let ada = member(&s).await;
  let book = BookId::new();
  let c = copy(&s, book, day(1, 1)).await;
  let loan = s
    .save_loan(Loan::open(ada.member_id, c.copy_id, book, day(1, 1), 14).unwrap())
    .await
    .unwrap();

  let now = Utc.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap();
  let fine = Fine::issue(ada.member_id, Some(loan.loan_id), FineReason::Overdue, dec!(1.25), now, 30);
  s.save_fine(fine.clone()).await.unwrap();
  s.save_fine(Fine::issue(ada.member_id, None, FineReason::Administrative, dec!(5), now, 30))
    .await
    .unwrap();

  assert_eq!(s.find_fines_by_loan(loan.loan_id).await.unwrap(), vec![fine]);
}

// ─── Reservations ────────────────────────────────────────────────────────────

#[tokio::test]
async fn reservations_by_book_follow_priority() {
  let s = store().await;
  let ada = member(&s).await;
  let bob = member(&s).await;
  let book = BookId::new();
  let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

  let second = Reservation::new(ada.member_id, book, 2, at);
  let first = Reservation::new(bob.member_id, book, 1, at + chrono::Duration::hours(1));
  s.save_reservation(second.clone()).await.unwrap();
  s.save_reservation(first.clone()).await.unwrap();

  assert_eq!(s.find_reservations_by_book(book).await.unwrap(), vec![first, second]);
  assert_eq!(s.max_priority(book).await.unwrap(), Some(2));
  assert_eq!(s.max_priority(BookId::new()).await.unwrap(), None);
}

#[tokio::test]
async fn open_and_ready_reservation_lookups() {
  let s = store().await;
  let ada = member(&s).await;
  let book = BookId::new();
  let c = copy(&s, book, day(1, 1)).await;
  let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

  let mut hold = Reservation::new(ada.member_id, book, 1, at);
  s.save_reservation(hold.clone()).await.unwrap();
  assert!(s.find_ready_reservation(c.copy_id).await.unwrap().is_none());

  hold.status = ReservationStatus::ReadyForPickup;
  hold.copy_id = Some(c.copy_id);
  s.save_reservation(hold.clone()).await.unwrap();

  assert_eq!(s.find_ready_reservation(c.copy_id).await.unwrap(), Some(hold.clone()));
  assert_eq!(
    s.find_open_reservation(ada.member_id, book).await.unwrap(),
    Some(hold.clone())
  );

  hold.status = ReservationStatus::Completed;
  s.save_reservation(hold).await.unwrap();
  assert!(s.find_open_reservation(ada.member_id, book).await.unwrap().is_none());
  assert_eq!(s.find_reservations_by_member(ada.member_id).await.unwrap().len(), 1);
}
