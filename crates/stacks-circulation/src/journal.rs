//! Undo journal for multi-record operations.
//!
//! Stores only promise single-record writes. An operation that touches
//! several records snapshots each record before overwriting it; if a later
//! write fails, the snapshots are written back newest first. Creations are
//! ordered last within an operation, so they never need undoing.

use std::future::Future;

use rust_decimal::Decimal;
use stacks_core::{
  Error, Result,
  copy::BookCopy,
  fine::Fine,
  id::MemberId,
  loan::Loan,
  reservation::Reservation,
};

/// A compensating write.
#[derive(Debug, Clone)]
pub enum Undo {
  Copy(BookCopy),
  Loan(Loan),
  Reservation(Reservation),
  Fine(Fine),
  /// Add `delta` back to the member's balance.
  Balance { member_id: MemberId, delta: Decimal },
}

impl Undo {
  fn describe(&self) -> String {
    match self {
      Self::Copy(c) => format!("copy {}", c.copy_id),
      Self::Loan(l) => format!("loan {}", l.loan_id),
      Self::Reservation(r) => format!("reservation {}", r.reservation_id),
      Self::Fine(f) => format!("fine {}", f.fine_id),
      Self::Balance { member_id, .. } => format!("balance of member {member_id}"),
    }
  }
}

#[derive(Debug, Default)]
pub struct Journal {
  entries: Vec<Undo>,
}

impl Journal {
  pub fn record(&mut self, undo: Undo) { self.entries.push(undo); }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// Replay every compensating write, newest first. A failed step is logged
  /// and the rest are still attempted.
  pub async fn unwind(self, target: &impl Restore) {
    for undo in self.entries.into_iter().rev() {
      let entry = undo.describe();
      if let Err(error) = target.restore(undo).await {
        tracing::error!(%error, %entry, "rollback step failed");
      }
    }
  }
}

/// Something that can write a snapshot back to its store.
pub trait Restore: Sync {
  fn restore(&self, undo: Undo) -> impl Future<Output = Result<()>> + Send;
}

/// Finish an operation: on failure, undo whatever it already wrote and log
/// the rejection at a level matching its kind.
pub async fn settle<T>(
  target: &impl Restore,
  operation: &'static str,
  journal: Journal,
  outcome: Result<T>,
) -> Result<T> {
  let error = match outcome {
    Ok(value) => return Ok(value),
    Err(error) => error,
  };

  if !journal.is_empty() {
    journal.unwind(target).await;
  }

  match &error {
    Error::Storage(_) => {
      tracing::error!(operation, %error, "storage failure, changes rolled back");
    }
    Error::ConcurrencyConflict { .. } => {
      tracing::warn!(operation, %error, "concurrency conflict");
    }
    Error::BusinessRule(_) | Error::InvalidState { .. } => {
      tracing::warn!(operation, %error, "request rejected");
    }
    Error::NotFound { .. } => {
      tracing::info!(operation, %error, "request rejected");
    }
  }
  Err(error)
}
