//! Error taxonomy shared by every Stacks crate.
//!
//! Callers distinguish "can't yet" ([`Error::BusinessRule`]) from "already
//! done" ([`Error::InvalidState`]) and from infrastructure trouble
//! ([`Error::ConcurrencyConflict`], [`Error::Storage`]).

use thiserror::Error;
use uuid::Uuid;

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  Loan,
  Copy,
  Member,
  Fine,
  Reservation,
}

/// A user-correctable rule that rejected the request.
///
/// The `Display` text is the reason shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusinessRule {
  #[error("outstanding fines")]
  OutstandingFines,

  #[error("No available copies")]
  NoAvailableCopies,

  #[error("Maximum renewals reached")]
  MaxRenewals,

  #[error("member already has an open reservation for this book")]
  DuplicatePending,

  #[error("invalid payment amount")]
  InvalidAmount,

  #[error("loan limit reached")]
  LoanLimit,

  #[error("account is not allowed to borrow")]
  NotABorrower,

  #[error("loan period must be between 1 and 365 days")]
  InvalidLoanPeriod,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  BusinessRule(#[from] BusinessRule),

  #[error("{entity} not found: {id}")]
  NotFound { entity: Entity, id: Uuid },

  #[error("cannot {attempted} {entity} {id} while it is {current}")]
  InvalidState {
    entity:    Entity,
    id:        Uuid,
    attempted: &'static str,
    current:   String,
  },

  #[error("{resource} is busy, retry the request")]
  ConcurrencyConflict { resource: String },

  #[error("storage failure: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(entity: Entity, id: impl Into<Uuid>) -> Self {
    Self::NotFound { entity, id: id.into() }
  }

  pub fn invalid_state(
    entity: Entity,
    id: impl Into<Uuid>,
    attempted: &'static str,
    current: impl ToString,
  ) -> Self {
    Self::InvalidState {
      entity,
      id: id.into(),
      attempted,
      current: current.to_string(),
    }
  }

  /// Wrap a collaborator failure.
  pub fn storage<E>(error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(error))
  }

  pub fn is_storage(&self) -> bool { matches!(self, Self::Storage(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
