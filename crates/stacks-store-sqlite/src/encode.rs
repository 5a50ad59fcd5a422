//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Ids are hyphenated lowercase UUID strings, dates are ISO 8601, instants
//! are RFC 3339 and money is decimal text. Enum columns use the same
//! SCREAMING_SNAKE_CASE (or lowercase, for roles) names as the JSON API.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use stacks_core::{
  account::Account,
  copy::BookCopy,
  fine::Fine,
  loan::Loan,
  reservation::Reservation,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_id(id: impl Into<Uuid>) -> String { id.into().hyphenated().to_string() }

pub fn decode_id<T: From<Uuid>>(s: &str) -> Result<T> { Ok(Uuid::parse_str(s)?.into()) }

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(column: &'static str, s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| decode_error(column, s))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(column: &'static str, s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| decode_error(column, s))
}

pub fn decode_money(column: &'static str, s: &str) -> Result<Decimal> {
  Decimal::from_str(s).map_err(|_| decode_error(column, s))
}

/// Parse a strum-backed enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| decode_error(column, s))
}

fn decode_error(column: &'static str, value: &str) -> Error {
  Error::Decode { column, value: value.to_owned() }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw column values read directly from an `accounts` row.
pub struct RawAccount {
  pub member_id:    String,
  pub name:         String,
  pub role:         String,
  pub joined_on:    String,
  pub fine_balance: String,
}

impl RawAccount {
  pub const COLUMNS: &'static str = "member_id, name, role, joined_on, fine_balance";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      member_id:    row.get(0)?,
      name:         row.get(1)?,
      role:         row.get(2)?,
      joined_on:    row.get(3)?,
      fine_balance: row.get(4)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      member_id:    decode_id(&self.member_id)?,
      name:         self.name,
      role:         decode_enum("accounts.role", &self.role)?,
      joined_on:    decode_date("accounts.joined_on", &self.joined_on)?,
      fine_balance: decode_money("accounts.fine_balance", &self.fine_balance)?,
    })
  }
}

/// Raw column values read directly from a `copies` row.
pub struct RawCopy {
  pub copy_id:     String,
  pub book_id:     String,
  pub condition:   String,
  pub location:    String,
  pub acquired_on: String,
  pub status:      String,
  pub retired:     bool,
}

impl RawCopy {
  pub const COLUMNS: &'static str =
    "copy_id, book_id, condition, location, acquired_on, status, retired";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      copy_id:     row.get(0)?,
      book_id:     row.get(1)?,
      condition:   row.get(2)?,
      location:    row.get(3)?,
      acquired_on: row.get(4)?,
      status:      row.get(5)?,
      retired:     row.get(6)?,
    })
  }

  pub fn into_copy(self) -> Result<BookCopy> {
    Ok(BookCopy {
      copy_id:     decode_id(&self.copy_id)?,
      book_id:     decode_id(&self.book_id)?,
      condition:   self.condition,
      location:    self.location,
      acquired_on: decode_date("copies.acquired_on", &self.acquired_on)?,
      status:      decode_enum("copies.status", &self.status)?,
      retired:     self.retired,
    })
  }
}

/// Raw column values read directly from a `loans` row.
pub struct RawLoan {
  pub loan_id:       String,
  pub member_id:     String,
  pub copy_id:       String,
  pub book_id:       String,
  pub checkout_date: String,
  pub due_date:      String,
  pub return_date:   Option<String>,
  pub status:        String,
  pub renewal_count: i64,
}

impl RawLoan {
  pub const COLUMNS: &'static str = "loan_id, member_id, copy_id, book_id, checkout_date, \
                             due_date, return_date, status, renewal_count";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      loan_id:       row.get(0)?,
      member_id:     row.get(1)?,
      copy_id:       row.get(2)?,
      book_id:       row.get(3)?,
      checkout_date: row.get(4)?,
      due_date:      row.get(5)?,
      return_date:   row.get(6)?,
      status:        row.get(7)?,
      renewal_count: row.get(8)?,
    })
  }

  pub fn into_loan(self) -> Result<Loan> {
    Ok(Loan {
      loan_id:       decode_id(&self.loan_id)?,
      member_id:     decode_id(&self.member_id)?,
      copy_id:       decode_id(&self.copy_id)?,
      book_id:       decode_id(&self.book_id)?,
      checkout_date: decode_date("loans.checkout_date", &self.checkout_date)?,
      due_date:      decode_date("loans.due_date", &self.due_date)?,
      return_date:   self
        .return_date
        .as_deref()
        .map(|d| decode_date("loans.return_date", d))
        .transpose()?,
      status:        decode_enum("loans.status", &self.status)?,
      renewal_count: u32::try_from(self.renewal_count)
        .map_err(|_| decode_error("loans.renewal_count", &self.renewal_count.to_string()))?,
    })
  }
}

/// Raw column values read directly from a `fines` row.
pub struct RawFine {
  pub fine_id:     String,
  pub member_id:   String,
  pub loan_id:     Option<String>,
  pub amount:      String,
  pub amount_paid: String,
  pub reason:      String,
  pub issue_date:  String,
  pub due_date:    String,
  pub status:      String,
  pub note:        Option<String>,
  pub recorded_at: String,
}

impl RawFine {
  pub const COLUMNS: &'static str = "fine_id, member_id, loan_id, amount, amount_paid, reason, \
                             issue_date, due_date, status, note, recorded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fine_id:     row.get(0)?,
      member_id:   row.get(1)?,
      loan_id:     row.get(2)?,
      amount:      row.get(3)?,
      amount_paid: row.get(4)?,
      reason:      row.get(5)?,
      issue_date:  row.get(6)?,
      due_date:    row.get(7)?,
      status:      row.get(8)?,
      note:        row.get(9)?,
      recorded_at: row.get(10)?,
    })
  }

  pub fn into_fine(self) -> Result<Fine> {
    Ok(Fine {
      fine_id:     decode_id(&self.fine_id)?,
      member_id:   decode_id(&self.member_id)?,
      loan_id:     self.loan_id.as_deref().map(decode_id).transpose()?,
      amount:      decode_money("fines.amount", &self.amount)?,
      amount_paid: decode_money("fines.amount_paid", &self.amount_paid)?,
      reason:      decode_enum("fines.reason", &self.reason)?,
      issue_date:  decode_date("fines.issue_date", &self.issue_date)?,
      due_date:    decode_date("fines.due_date", &self.due_date)?,
      status:      decode_enum("fines.status", &self.status)?,
      note:        self.note,
      recorded_at: decode_dt("fines.recorded_at", &self.recorded_at)?,
    })
  }
}

/// Raw column values read directly from a `reservations` row.
pub struct RawReservation {
  pub reservation_id:  String,
  pub member_id:       String,
  pub book_id:         String,
  pub reserved_at:     String,
  pub status:          String,
  pub priority_number: i64,
  pub copy_id:         Option<String>,
}

impl RawReservation {
  pub const COLUMNS: &'static str = "reservation_id, member_id, book_id, reserved_at, status, \
                             priority_number, copy_id";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      reservation_id:  row.get(0)?,
      member_id:       row.get(1)?,
      book_id:         row.get(2)?,
      reserved_at:     row.get(3)?,
      status:          row.get(4)?,
      priority_number: row.get(5)?,
      copy_id:         row.get(6)?,
    })
  }

  pub fn into_reservation(self) -> Result<Reservation> {
    Ok(Reservation {
      reservation_id:  decode_id(&self.reservation_id)?,
      member_id:       decode_id(&self.member_id)?,
      book_id:         decode_id(&self.book_id)?,
      reserved_at:     decode_dt("reservations.reserved_at", &self.reserved_at)?,
      status:          decode_enum("reservations.status", &self.status)?,
      priority_number: u64::try_from(self.priority_number).map_err(|_| {
        decode_error(
          "reservations.priority_number",
          &self.priority_number.to_string(),
        )
      })?,
      copy_id:         self.copy_id.as_deref().map(decode_id).transpose()?,
    })
  }
}
