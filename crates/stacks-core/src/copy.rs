//! Physical copies and their availability state machine.
//!
//! ```text
//! AVAILABLE ──check out──▶ CHECKED_OUT ──check in──▶ AVAILABLE | RESERVED
//! RESERVED  ──collect───▶ CHECKED_OUT
//! RESERVED  ──release hold──▶ AVAILABLE | RESERVED (next holder)
//! any but CHECKED_OUT ──mark lost / repair──▶ LOST | IN_REPAIR
//! LOST | IN_REPAIR ──return to service──▶ AVAILABLE | RESERVED
//! CHECKED_OUT ──loan lost──▶ LOST
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::id::{BookId, CopyId};

// ─── Status ──────────────────────────────────────────────────────────────────

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
pub enum CopyStatus {
  Available,
  CheckedOut,
  InRepair,
  Lost,
  Reserved,
}

/// Something that happens to a copy. `held` is true when the reservation
/// queue has a pending hold waiting for the copy's book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyEvent {
  CheckOut,
  CollectHold,
  CheckIn { held: bool },
  ReleaseHold { held: bool },
  MarkLost,
  MarkRepair,
  ReturnToService { held: bool },
  LostOnLoan,
}

impl CopyEvent {
  /// Verb used in error messages.
  pub fn verb(self) -> &'static str {
    match self {
      Self::CheckOut => "check out",
      Self::CollectHold => "collect the hold on",
      Self::CheckIn { .. } => "check in",
      Self::ReleaseHold { .. } => "release the hold on",
      Self::MarkLost => "mark lost",
      Self::MarkRepair => "send to repair",
      Self::ReturnToService { .. } => "return to service",
      Self::LostOnLoan => "write off",
    }
  }
}

impl CopyStatus {
  /// The status after `event`, or `None` if the transition is not allowed.
  pub fn next(self, event: CopyEvent) -> Option<Self> {
    let after_release = |held: bool| {
      if held { Self::Reserved } else { Self::Available }
    };

    match (self, event) {
      (Self::Available, CopyEvent::CheckOut) => Some(Self::CheckedOut),
      (Self::Reserved, CopyEvent::CollectHold) => Some(Self::CheckedOut),
      (Self::CheckedOut, CopyEvent::CheckIn { held }) => Some(after_release(held)),
      (Self::Reserved, CopyEvent::ReleaseHold { held }) => {
        Some(after_release(held))
      }
      (Self::CheckedOut, CopyEvent::LostOnLoan) => Some(Self::Lost),
      (Self::CheckedOut, CopyEvent::MarkLost | CopyEvent::MarkRepair) => None,
      (_, CopyEvent::MarkLost) => Some(Self::Lost),
      (_, CopyEvent::MarkRepair) => Some(Self::InRepair),
      (Self::InRepair | Self::Lost, CopyEvent::ReturnToService { held }) => {
        Some(after_release(held))
      }
      _ => None,
    }
  }
}

// ─── BookCopy ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCopy {
  pub copy_id:     CopyId,
  pub book_id:     BookId,
  /// Free-text physical condition, e.g. "good" or "spine cracked".
  pub condition:   String,
  /// Shelf mark or branch.
  pub location:    String,
  pub acquired_on: NaiveDate,
  pub status:      CopyStatus,
  /// Retired copies are kept for loan history but never lent again.
  pub retired:     bool,
}

impl BookCopy {
  /// A newly acquired copy, ready to lend.
  pub fn acquire(
    book_id: BookId,
    condition: impl Into<String>,
    location: impl Into<String>,
    acquired_on: NaiveDate,
  ) -> Self {
    Self {
      copy_id: CopyId::new(),
      book_id,
      condition: condition.into(),
      location: location.into(),
      acquired_on,
      status: CopyStatus::Available,
      retired: false,
    }
  }

  pub fn is_lendable(&self) -> bool {
    self.status == CopyStatus::Available && !self.retired
  }
}
