//! SQL schema for the Stacks SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Money is stored as decimal TEXT, never REAL. Dates are ISO 8601
/// (`YYYY-MM-DD`), so they compare correctly as strings.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    member_id     TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    role          TEXT NOT NULL,   -- 'borrower' | 'staff' | 'administrator'
    joined_on     TEXT NOT NULL,
    fine_balance  TEXT NOT NULL DEFAULT '0'
);

CREATE TABLE IF NOT EXISTS copies (
    copy_id       TEXT PRIMARY KEY,
    book_id       TEXT NOT NULL,
    condition     TEXT NOT NULL,
    location      TEXT NOT NULL,
    acquired_on   TEXT NOT NULL,
    status        TEXT NOT NULL,
    retired       INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS loans (
    loan_id       TEXT PRIMARY KEY,
    member_id     TEXT NOT NULL REFERENCES accounts(member_id),
    copy_id       TEXT NOT NULL REFERENCES copies(copy_id),
    book_id       TEXT NOT NULL,
    checkout_date TEXT NOT NULL,
    due_date      TEXT NOT NULL,
    return_date   TEXT,
    status        TEXT NOT NULL,   -- never 'OVERDUE'; that is derived on read
    renewal_count INTEGER NOT NULL DEFAULT 0
);

-- Fines are never deleted.
CREATE TABLE IF NOT EXISTS fines (
    fine_id       TEXT PRIMARY KEY,
    member_id     TEXT NOT NULL REFERENCES accounts(member_id),
    loan_id       TEXT REFERENCES loans(loan_id),
    amount        TEXT NOT NULL,
    amount_paid   TEXT NOT NULL DEFAULT '0',
    reason        TEXT NOT NULL,
    issue_date    TEXT NOT NULL,
    due_date      TEXT NOT NULL,
    status        TEXT NOT NULL,
    note          TEXT,
    recorded_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reservations (
    reservation_id  TEXT PRIMARY KEY,
    member_id       TEXT NOT NULL REFERENCES accounts(member_id),
    book_id         TEXT NOT NULL,
    reserved_at     TEXT NOT NULL,
    status          TEXT NOT NULL,
    priority_number INTEGER NOT NULL,
    copy_id         TEXT REFERENCES copies(copy_id),
    UNIQUE (book_id, priority_number)
);

CREATE INDEX IF NOT EXISTS copies_book_idx         ON copies(book_id, status);
CREATE INDEX IF NOT EXISTS loans_member_idx        ON loans(member_id);
CREATE INDEX IF NOT EXISTS loans_due_idx           ON loans(status, due_date);
CREATE INDEX IF NOT EXISTS fines_member_idx        ON fines(member_id);
CREATE INDEX IF NOT EXISTS fines_loan_idx          ON fines(loan_id);
CREATE INDEX IF NOT EXISTS reservations_book_idx   ON reservations(book_id, priority_number);
CREATE INDEX IF NOT EXISTS reservations_member_idx ON reservations(member_id);

PRAGMA user_version = 1;
";
