//! The reservation queue: the only writer of reservation status and
//! priority numbers.
//!
//! Every write for a book happens under that book's lock, which is what
//! makes `max + 1` priority assignment safe.

use std::sync::Arc;

use stacks_core::{
  BusinessRule, Entity, Error, Result,
  clock::Clock,
  id::{BookId, CopyId, MemberId, ReservationId},
  reservation::{Reservation, ReservationStatus, next_in_line},
  store::ReservationStore,
};

use crate::{
  journal::{Journal, Restore, Undo, settle},
  lock::{Held, Locks},
};

pub struct ReservationQueue<R> {
  store: Arc<R>,
  locks: Arc<Locks>,
  clock: Arc<dyn Clock>,
}

impl<R: ReservationStore> ReservationQueue<R> {
  pub fn new(store: Arc<R>, locks: Arc<Locks>, clock: Arc<dyn Clock>) -> Self {
    Self { store, locks, clock }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get(&self, reservation_id: ReservationId) -> Result<Reservation> {
    self
      .store
      .find_reservation(reservation_id)
      .await
      .map_err(Error::storage)?
      .ok_or_else(|| Error::not_found(Entity::Reservation, reservation_id))
  }

  pub async fn reservations_for(&self, book_id: BookId) -> Result<Vec<Reservation>> {
    self
      .store
      .find_reservations_by_book(book_id)
      .await
      .map_err(Error::storage)
  }

  pub async fn reservations_of(&self, member_id: MemberId) -> Result<Vec<Reservation>> {
    self
      .store
      .find_reservations_by_member(member_id)
      .await
      .map_err(Error::storage)
  }

  /// The PENDING reservation that would be served next.
  pub async fn peek_next(&self, book_id: BookId) -> Result<Option<Reservation>> {
    let all = self.reservations_for(book_id).await?;
    Ok(next_in_line(&all).cloned())
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  pub async fn enqueue(&self, member_id: MemberId, book_id: BookId) -> Result<Reservation> {
    let book = self.locks.books.acquire(book_id).await?;
    let outcome = self.enqueue_held(&book, member_id).await;
    settle(self, "enqueue", Journal::default(), outcome).await
  }

  /// Set `copy_id` aside for the next PENDING reservation. The caller owns
  /// the copy's own transition to RESERVED.
  pub async fn fulfill(
    &self,
    book_id: BookId,
    copy_id: CopyId,
  ) -> Result<Option<Reservation>> {
    let book = self.locks.books.acquire(book_id).await?;
    let mut journal = Journal::default();
    let outcome = self.fulfill_held(&book, copy_id, &mut journal).await;
    settle(self, "fulfill", journal, outcome).await
  }

  // ── Under the book lock ───────────────────────────────────────────────────

  pub(crate) async fn enqueue_held(
    &self,
    book: &Held<BookId>,
    member_id: MemberId,
  ) -> Result<Reservation> {
    let open = self
      .store
      .find_open_reservation(member_id, book.key())
      .await
      .map_err(Error::storage)?;
    if open.is_some() {
      return Err(BusinessRule::DuplicatePending.into());
    }

    let priority = self
      .store
      .max_priority(book.key())
      .await
      .map_err(Error::storage)?
      .map_or(1, |max| max + 1);

    let reservation = self
      .store
      .save_reservation(Reservation::new(
        member_id,
        book.key(),
        priority,
        self.clock.now(),
      ))
      .await
      .map_err(Error::storage)?;

    tracing::info!(
      reservation_id = %reservation.reservation_id,
      %member_id,
      book_id = %book.key(),
      priority,
      "reservation queued"
    );
    Ok(reservation)
  }

  pub(crate) async fn peek_next_held(
    &self,
    book: &Held<BookId>,
  ) -> Result<Option<Reservation>> {
    self.peek_next(book.key()).await
  }

  pub(crate) async fn fulfill_held(
    &self,
    book: &Held<BookId>,
    copy_id: CopyId,
    journal: &mut Journal,
  ) -> Result<Option<Reservation>> {
    let Some(next) = self.peek_next_held(book).await? else {
      return Ok(None);
    };

    let mut ready = next.clone();
    ready.status = ReservationStatus::ReadyForPickup;
    ready.copy_id = Some(copy_id);
    let ready = self.overwrite(next, ready, journal).await?;

    tracing::info!(
      reservation_id = %ready.reservation_id,
      member_id = %ready.member_id,
      %copy_id,
      "hold ready for pickup"
    );
    Ok(Some(ready))
  }

  /// The member's open reservation for this book, if any.
  pub(crate) async fn open_for_held(
    &self,
    book: &Held<BookId>,
    member_id: MemberId,
  ) -> Result<Option<Reservation>> {
    self
      .store
      .find_open_reservation(member_id, book.key())
      .await
      .map_err(Error::storage)
  }

  /// PENDING or READY_FOR_PICKUP → COMPLETED, once the member has a copy of
  /// the book in hand.
  pub(crate) async fn complete_held(
    &self,
    book: &Held<BookId>,
    reservation_id: ReservationId,
    journal: &mut Journal,
  ) -> Result<Reservation> {
    let before = self.get_in_book(book, reservation_id).await?;
    if !before.status.is_open() {
      return Err(Error::invalid_state(
        Entity::Reservation,
        reservation_id,
        "complete",
        before.status,
      ));
    }
    let mut after = before.clone();
    after.status = ReservationStatus::Completed;
    self.overwrite(before, after, journal).await
  }

  /// PENDING or READY_FOR_PICKUP → CANCELLED. The returned record keeps the
  /// copy it was holding, if any, so the caller can release it.
  pub(crate) async fn cancel_held(
    &self,
    book: &Held<BookId>,
    reservation_id: ReservationId,
    journal: &mut Journal,
  ) -> Result<Reservation> {
    let before = self.get_in_book(book, reservation_id).await?;
    if !before.status.is_open() {
      return Err(Error::invalid_state(
        Entity::Reservation,
        reservation_id,
        "cancel",
        before.status,
      ));
    }
    let mut after = before.clone();
    after.status = ReservationStatus::Cancelled;
    let cancelled = self.overwrite(before, after, journal).await?;
    tracing::info!(%reservation_id, "reservation cancelled");
    Ok(cancelled)
  }

  /// A copy set aside for a hold became unusable: put the reservation back
  /// in line at its original priority.
  pub(crate) async fn revoke_hold_held(
    &self,
    book: &Held<BookId>,
    copy_id: CopyId,
    journal: &mut Journal,
  ) -> Result<Option<Reservation>> {
    let ready = self
      .store
      .find_ready_reservation(copy_id)
      .await
      .map_err(Error::storage)?
      .filter(|r| r.book_id == book.key());
    let Some(before) = ready else {
      return Ok(None);
    };

    let mut after = before.clone();
    after.status = ReservationStatus::Pending;
    after.copy_id = None;
    let revoked = self.overwrite(before, after, journal).await?;
    tracing::info!(
      reservation_id = %revoked.reservation_id,
      %copy_id,
      "hold revoked, reservation back in line"
    );
    Ok(Some(revoked))
  }

  async fn get_in_book(
    &self,
    book: &Held<BookId>,
    reservation_id: ReservationId,
  ) -> Result<Reservation> {
    let reservation = self.get(reservation_id).await?;
    if reservation.book_id != book.key() {
      return Err(Error::not_found(Entity::Reservation, reservation_id));
    }
    Ok(reservation)
  }

  async fn overwrite(
    &self,
    before: Reservation,
    after: Reservation,
    journal: &mut Journal,
  ) -> Result<Reservation> {
    journal.record(Undo::Reservation(before));
    self
      .store
      .save_reservation(after)
      .await
      .map_err(Error::storage)
  }
}

impl<R: ReservationStore> Restore for ReservationQueue<R> {
  async fn restore(&self, undo: Undo) -> Result<()> {
    match undo {
      Undo::Reservation(reservation) => {
        self
          .store
          .save_reservation(reservation)
          .await
          .map_err(Error::storage)?;
      }
      other => {
        tracing::error!(?other, "reservation queue cannot restore this record");
      }
    }
    Ok(())
  }
}
