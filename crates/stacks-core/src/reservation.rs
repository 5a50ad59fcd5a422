//! Reservations (holds) on a book title.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{BookId, CopyId, MemberId, ReservationId};

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
pub enum ReservationStatus {
  Pending,
  ReadyForPickup,
  Completed,
  Cancelled,
}

impl ReservationStatus {
  /// A member may hold at most one open reservation per book.
  pub fn is_open(self) -> bool {
    matches!(self, Self::Pending | Self::ReadyForPickup)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
  pub reservation_id:  ReservationId,
  pub member_id:       MemberId,
  pub book_id:         BookId,
  pub reserved_at:     DateTime<Utc>,
  pub status:          ReservationStatus,
  /// Strictly increasing per book; gaps left by cancellations are never
  /// reused.
  pub priority_number: u64,
  /// The copy set aside for the member while READY_FOR_PICKUP.
  pub copy_id:         Option<CopyId>,
}

impl Reservation {
  pub fn new(
    member_id: MemberId,
    book_id: BookId,
    priority_number: u64,
    reserved_at: DateTime<Utc>,
  ) -> Self {
    Self {
      reservation_id: ReservationId::new(),
      member_id,
      book_id,
      reserved_at,
      status: ReservationStatus::Pending,
      priority_number,
      copy_id: None,
    }
  }

  /// Fulfilment order: priority number, then reservation time.
  pub fn queue_position(&self) -> (u64, DateTime<Utc>) {
    (self.priority_number, self.reserved_at)
  }
}

/// The PENDING reservation that should be served next, if any.
pub fn next_in_line<'a>(
  reservations: impl IntoIterator<Item = &'a Reservation>,
) -> Option<&'a Reservation> {
  reservations
    .into_iter()
    .filter(|r| r.status == ReservationStatus::Pending)
    .min_by_key(|r| r.queue_position())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn next_in_line_skips_non_pending_and_orders_by_priority() {
    let book = BookId::new();
    let at = |s| Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, s).unwrap();

    let mut first = Reservation::new(MemberId::new(), book, 1, at(0));
    first.status = ReservationStatus::Cancelled;
    let second = Reservation::new(MemberId::new(), book, 3, at(1));
    let third = Reservation::new(MemberId::new(), book, 2, at(2));

    let all = [first, second, third.clone()];
    assert_eq!(next_in_line(&all), Some(&third));
  }

  #[test]
  fn ties_fall_back_to_reservation_time() {
    let book = BookId::new();
    let early = Reservation::new(
      MemberId::new(),
      book,
      4,
      Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    );
    let late = Reservation::new(
      MemberId::new(),
      book,
      4,
      Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
    );
    let all = [late, early.clone()];
    assert_eq!(next_in_line(&all), Some(&early));
  }
}
