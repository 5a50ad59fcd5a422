//! [`SqliteStore`]: the SQLite implementation of every circulation store.

use std::{path::Path, str::FromStr};

use chrono::NaiveDate;
use rusqlite::{OptionalExtension as _, types::Value};
use rust_decimal::Decimal;
use stacks_core::{
  account::Account,
  copy::{BookCopy, CopyStatus},
  fine::Fine,
  id::{BookId, CopyId, FineId, LoanId, MemberId, ReservationId},
  loan::{Loan, LoanStatus},
  reservation::{Reservation, ReservationStatus},
  store::{BookCopyStore, LoanStore, MemberFineStore, ReservationStore},
};

use crate::{
  Error, Result,
  encode::{
    RawAccount, RawCopy, RawFine, RawLoan, RawReservation, encode_date, encode_dt,
    encode_id,
  },
  schema::SCHEMA,
};

type FromRow<R> = fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A circulation store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every write
/// is a single-row upsert, except [`MemberFineStore::update_balance`], which
/// reads and writes the balance inside one transaction.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn execute(&self, sql: &'static str, params: Vec<Value>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(sql, rusqlite::params_from_iter(params))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_one<R: Send + 'static>(
    &self,
    sql: String,
    params: Vec<Value>,
    from_row: FromRow<R>,
  ) -> Result<Option<R>> {
    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), from_row)
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  async fn fetch_all<R: Send + 'static>(
    &self,
    sql: String,
    params: Vec<Value>,
    from_row: FromRow<R>,
  ) -> Result<Vec<R>> {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}

fn integer(name: &'static str, n: u64) -> Result<Value> {
  i64::try_from(n)
    .map(Value::Integer)
    .map_err(|_| Error::OutOfRange(name))
}

// ─── Loans ───────────────────────────────────────────────────────────────────

impl LoanStore for SqliteStore {
  type Error = Error;

  async fn save_loan(&self, loan: Loan) -> Result<Loan> {
    let params: Vec<Value> = vec![
      encode_id(loan.loan_id).into(),
      encode_id(loan.member_id).into(),
      encode_id(loan.copy_id).into(),
      encode_id(loan.book_id).into(),
      encode_date(loan.checkout_date).into(),
      encode_date(loan.due_date).into(),
      loan.return_date.map(encode_date).into(),
      loan.status.as_ref().to_owned().into(),
      i64::from(loan.renewal_count).into(),
    ];
    self
      .execute(
        "INSERT INTO loans (
           loan_id, member_id, copy_id, book_id, checkout_date,
           due_date, return_date, status, renewal_count
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT (loan_id) DO UPDATE SET
           due_date      = excluded.due_date,
           return_date   = excluded.return_date,
           status        = excluded.status,
           renewal_count = excluded.renewal_count",
        params,
      )
      .await?;
    Ok(loan)
  }

  async fn find_loan(&self, id: LoanId) -> Result<Option<Loan>> {
    let sql = format!("SELECT {} FROM loans WHERE loan_id = ?1", RawLoan::COLUMNS);
    self
      .fetch_one(sql, vec![encode_id(id).into()], RawLoan::from_row)
      .await?
      .map(RawLoan::into_loan)
      .transpose()
  }

  async fn find_active_loan(
    &self,
    member_id: MemberId,
    copy_id: CopyId,
  ) -> Result<Option<Loan>> {
    let sql = format!(
      "SELECT {} FROM loans WHERE member_id = ?1 AND copy_id = ?2 AND status = ?3",
      RawLoan::COLUMNS
    );
    let params: Vec<Value> = vec![
      encode_id(member_id).into(),
      encode_id(copy_id).into(),
      LoanStatus::Active.as_ref().to_owned().into(),
    ];
    self
      .fetch_one(sql, params, RawLoan::from_row)
      .await?
      .map(RawLoan::into_loan)
      .transpose()
  }

  async fn find_loans_by_member(&self, member_id: MemberId) -> Result<Vec<Loan>> {
    let sql = format!(
      "SELECT {} FROM loans WHERE member_id = ?1
       ORDER BY checkout_date DESC, rowid DESC",
      RawLoan::COLUMNS
    );
    self
      .fetch_all(sql, vec![encode_id(member_id).into()], RawLoan::from_row)
      .await?
      .into_iter()
      .map(RawLoan::into_loan)
      .collect()
  }

  async fn find_overdue_loans(&self, as_of: NaiveDate) -> Result<Vec<Loan>> {
    let sql = format!(
      "SELECT {} FROM loans WHERE status = ?1 AND due_date < ?2
       ORDER BY due_date, rowid",
      RawLoan::COLUMNS
    );
    let params: Vec<Value> = vec![
      LoanStatus::Active.as_ref().to_owned().into(),
      encode_date(as_of).into(),
    ];
    self
      .fetch_all(sql, params, RawLoan::from_row)
      .await?
      .into_iter()
      .map(RawLoan::into_loan)
      .collect()
  }
}

// ─── Copies ──────────────────────────────────────────────────────────────────

impl BookCopyStore for SqliteStore {
  type Error = Error;

  async fn save_copy(&self, copy: BookCopy) -> Result<BookCopy> {
    let params: Vec<Value> = vec![
      encode_id(copy.copy_id).into(),
      encode_id(copy.book_id).into(),
      copy.condition.clone().into(),
      copy.location.clone().into(),
      encode_date(copy.acquired_on).into(),
      copy.status.as_ref().to_owned().into(),
      copy.retired.into(),
    ];
    self
      .execute(
        "INSERT INTO copies (
           copy_id, book_id, condition, location, acquired_on, status, retired
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (copy_id) DO UPDATE SET
           condition = excluded.condition,
           location  = excluded.location,
           status    = excluded.status,
           retired   = excluded.retired",
        params,
      )
      .await?;
    Ok(copy)
  }

  async fn find_copy(&self, id: CopyId) -> Result<Option<BookCopy>> {
    let sql = format!("SELECT {} FROM copies WHERE copy_id = ?1", RawCopy::COLUMNS);
    self
      .fetch_one(sql, vec![encode_id(id).into()], RawCopy::from_row)
      .await?
      .map(RawCopy::into_copy)
      .transpose()
  }

  async fn find_available_copies(&self, book_id: BookId) -> Result<Vec<BookCopy>> {
    let sql = format!(
      "SELECT {} FROM copies WHERE book_id = ?1 AND status = ?2 AND retired = 0
       ORDER BY acquired_on, rowid",
      RawCopy::COLUMNS
    );
    let params: Vec<Value> = vec![
      encode_id(book_id).into(),
      CopyStatus::Available.as_ref().to_owned().into(),
    ];
    self
      .fetch_all(sql, params, RawCopy::from_row)
      .await?
      .into_iter()
      .map(RawCopy::into_copy)
      .collect()
  }

  async fn find_copies_by_book(&self, book_id: BookId) -> Result<Vec<BookCopy>> {
    let sql = format!(
      "SELECT {} FROM copies WHERE book_id = ?1 ORDER BY acquired_on, rowid",
      RawCopy::COLUMNS
    );
    self
      .fetch_all(sql, vec![encode_id(book_id).into()], RawCopy::from_row)
      .await?
      .into_iter()
      .map(RawCopy::into_copy)
      .collect()
  }
}

// ─── Members and fines ───────────────────────────────────────────────────────

impl MemberFineStore for SqliteStore {
  type Error = Error;

  async fn find_account(&self, member_id: MemberId) -> Result<Option<Account>> {
    let sql = format!(
      "SELECT {} FROM accounts WHERE member_id = ?1",
      RawAccount::COLUMNS
    );
    self
      .fetch_one(sql, vec![encode_id(member_id).into()], RawAccount::from_row)
      .await?
      .map(RawAccount::into_account)
      .transpose()
  }

  /// Inserts with the given balance; an existing account keeps its stored
  /// balance, which only [`MemberFineStore::update_balance`] changes.
  async fn save_account(&self, account: Account) -> Result<Account> {
    let params: Vec<Value> = vec![
      encode_id(account.member_id).into(),
      account.name.clone().into(),
      account.role.as_ref().to_owned().into(),
      encode_date(account.joined_on).into(),
      account.fine_balance.to_string().into(),
    ];
    self
      .execute(
        "INSERT INTO accounts (member_id, name, role, joined_on, fine_balance)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (member_id) DO UPDATE SET
           name      = excluded.name,
           role      = excluded.role,
           joined_on = excluded.joined_on",
        params,
      )
      .await?;
    self
      .find_account(account.member_id)
      .await?
      .ok_or(Error::MemberNotFound(account.member_id.into()))
  }

  async fn find_fines_by_member(&self, member_id: MemberId) -> Result<Vec<Fine>> {
    let sql = format!(
      "SELECT {} FROM fines WHERE member_id = ?1 ORDER BY issue_date, recorded_at",
      RawFine::COLUMNS
    );
    self
      .fetch_all(sql, vec![encode_id(member_id).into()], RawFine::from_row)
      .await?
      .into_iter()
      .map(RawFine::into_fine)
      .collect()
  }

  async fn find_fines_by_loan(&self, loan_id: LoanId) -> Result<Vec<Fine>> {
    let sql = format!(
      "SELECT {} FROM fines WHERE loan_id = ?1 ORDER BY issue_date, recorded_at",
      RawFine::COLUMNS
    );
    self
      .fetch_all(sql, vec![encode_id(loan_id).into()], RawFine::from_row)
      .await?
      .into_iter()
      .map(RawFine::into_fine)
      .collect()
  }

  async fn find_fine(&self, fine_id: FineId) -> Result<Option<Fine>> {
    let sql = format!("SELECT {} FROM fines WHERE fine_id = ?1", RawFine::COLUMNS);
    self
      .fetch_one(sql, vec![encode_id(fine_id).into()], RawFine::from_row)
      .await?
      .map(RawFine::into_fine)
      .transpose()
  }

  async fn save_fine(&self, fine: Fine) -> Result<Fine> {
    let params: Vec<Value> = vec![
      encode_id(fine.fine_id).into(),
      encode_id(fine.member_id).into(),
      fine.loan_id.map(encode_id).into(),
      fine.amount.to_string().into(),
      fine.amount_paid.to_string().into(),
      fine.reason.as_ref().to_owned().into(),
      encode_date(fine.issue_date).into(),
      encode_date(fine.due_date).into(),
      fine.status.as_ref().to_owned().into(),
      fine.note.clone().into(),
      encode_dt(fine.recorded_at).into(),
    ];
    self
      .execute(
        "INSERT INTO fines (
           fine_id, member_id, loan_id, amount, amount_paid, reason,
           issue_date, due_date, status, note, recorded_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT (fine_id) DO UPDATE SET
           amount      = excluded.amount,
           amount_paid = excluded.amount_paid,
           status      = excluded.status,
           note        = excluded.note",
        params,
      )
      .await?;
    Ok(fine)
  }

  async fn get_balance(&self, member_id: MemberId) -> Result<Decimal> {
    Ok(
      self
        .find_account(member_id)
        .await?
        .map_or(Decimal::ZERO, |a| a.fine_balance),
    )
  }

  async fn update_balance(&self, member_id: MemberId, delta: Decimal) -> Result<Decimal> {
    let id = encode_id(member_id);
    let balance = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current: Option<String> = tx
          .query_row(
            "SELECT fine_balance FROM accounts WHERE member_id = ?1",
            rusqlite::params![id],
            |r| r.get(0),
          )
          .optional()?;
        let Some(current) = current else {
          return Ok(None);
        };
        let current = Decimal::from_str(&current)
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        let next = current + delta;
        tx.execute(
          "UPDATE accounts SET fine_balance = ?1 WHERE member_id = ?2",
          rusqlite::params![next.to_string(), id],
        )?;
        tx.commit()?;
        Ok(Some(next))
      })
      .await?;
    balance.ok_or(Error::MemberNotFound(member_id.into()))
  }
}

// ─── Reservations ────────────────────────────────────────────────────────────

impl ReservationStore for SqliteStore {
  type Error = Error;

  async fn save_reservation(&self, reservation: Reservation) -> Result<Reservation> {
    let params: Vec<Value> = vec![
      encode_id(reservation.reservation_id).into(),
      encode_id(reservation.member_id).into(),
      encode_id(reservation.book_id).into(),
      encode_dt(reservation.reserved_at).into(),
      reservation.status.as_ref().to_owned().into(),
      integer("priority_number", reservation.priority_number)?,
      reservation.copy_id.map(encode_id).into(),
    ];
    self
      .execute(
        "INSERT INTO reservations (
           reservation_id, member_id, book_id, reserved_at, status,
           priority_number, copy_id
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (reservation_id) DO UPDATE SET
           status  = excluded.status,
           copy_id = excluded.copy_id",
        params,
      )
      .await?;
    Ok(reservation)
  }

  async fn find_reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
    let sql = format!(
      "SELECT {} FROM reservations WHERE reservation_id = ?1",
      RawReservation::COLUMNS
    );
    self
      .fetch_one(sql, vec![encode_id(id).into()], RawReservation::from_row)
      .await?
      .map(RawReservation::into_reservation)
      .transpose()
  }

  async fn find_reservations_by_book(&self, book_id: BookId) -> Result<Vec<Reservation>> {
    let sql = format!(
      "SELECT {} FROM reservations WHERE book_id = ?1
       ORDER BY priority_number, reserved_at",
      RawReservation::COLUMNS
    );
    self
      .fetch_all(sql, vec![encode_id(book_id).into()], RawReservation::from_row)
      .await?
      .into_iter()
      .map(RawReservation::into_reservation)
      .collect()
  }

  async fn find_reservations_by_member(
    &self,
    member_id: MemberId,
  ) -> Result<Vec<Reservation>> {
    let sql = format!(
      "SELECT {} FROM reservations WHERE member_id = ?1 ORDER BY reserved_at",
      RawReservation::COLUMNS
    );
    self
      .fetch_all(sql, vec![encode_id(member_id).into()], RawReservation::from_row)
      .await?
      .into_iter()
      .map(RawReservation::into_reservation)
      .collect()
  }

  async fn find_open_reservation(
    &self,
    member_id: MemberId,
    book_id: BookId,
  ) -> Result<Option<Reservation>> {
    let sql = format!(
      "SELECT {} FROM reservations
       WHERE member_id = ?1 AND book_id = ?2 AND status IN (?3, ?4)
       ORDER BY priority_number LIMIT 1",
      RawReservation::COLUMNS
    );
    let params: Vec<Value> = vec![
      encode_id(member_id).into(),
      encode_id(book_id).into(),
      ReservationStatus::Pending.as_ref().to_owned().into(),
      ReservationStatus::ReadyForPickup.as_ref().to_owned().into(),
    ];
    self
      .fetch_one(sql, params, RawReservation::from_row)
      .await?
      .map(RawReservation::into_reservation)
      .transpose()
  }

  async fn find_ready_reservation(&self, copy_id: CopyId) -> Result<Option<Reservation>> {
    let sql = format!(
      "SELECT {} FROM reservations WHERE copy_id = ?1 AND status = ?2 LIMIT 1",
      RawReservation::COLUMNS
    );
    let params: Vec<Value> = vec![
      encode_id(copy_id).into(),
      ReservationStatus::ReadyForPickup.as_ref().to_owned().into(),
    ];
    self
      .fetch_one(sql, params, RawReservation::from_row)
      .await?
      .map(RawReservation::into_reservation)
      .transpose()
  }

  async fn max_priority(&self, book_id: BookId) -> Result<Option<u64>> {
    let id = encode_id(book_id);
    let max: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT MAX(priority_number) FROM reservations WHERE book_id = ?1",
          rusqlite::params![id],
          |r| r.get(0),
        )?)
      })
      .await?;
    max
      .map(|n| {
        u64::try_from(n).map_err(|_| Error::Decode {
          column: "reservations.priority_number",
          value:  n.to_string(),
        })
      })
      .transpose()
  }
}
