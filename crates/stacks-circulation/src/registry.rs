//! The book-copy registry: the only writer of copy status.
//!
//! Transitions are checked against [`CopyStatus::next`] and always happen
//! under the copy's lock. Anything that can put a copy into RESERVED also
//! holds the book's lock, because it consults the reservation queue.

use std::sync::Arc;

use stacks_core::{
  Entity, Error, Result,
  clock::Clock,
  copy::{BookCopy, CopyEvent, CopyStatus},
  id::{BookId, CopyId},
  reservation::Reservation,
  store::{BookCopyStore, ReservationStore},
};

use crate::{
  journal::{Journal, Restore, Undo, settle},
  lock::{Held, Locks},
  queue::ReservationQueue,
};

pub struct CopyRegistry<C, R> {
  store: Arc<C>,
  queue: Arc<ReservationQueue<R>>,
  locks: Arc<Locks>,
  clock: Arc<dyn Clock>,
}

impl<C, R> CopyRegistry<C, R>
where
  C: BookCopyStore,
  R: ReservationStore,
{
  pub fn new(
    store: Arc<C>,
    queue: Arc<ReservationQueue<R>>,
    locks: Arc<Locks>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self { store, queue, locks, clock }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get_copy(&self, copy_id: CopyId) -> Result<BookCopy> {
    self
      .store
      .find_copy(copy_id)
      .await
      .map_err(Error::storage)?
      .ok_or_else(|| Error::not_found(Entity::Copy, copy_id))
  }

  pub async fn copies_of(&self, book_id: BookId) -> Result<Vec<BookCopy>> {
    self
      .store
      .find_copies_by_book(book_id)
      .await
      .map_err(Error::storage)
  }

  /// Copies that could be lent right now, oldest acquisition first.
  pub async fn available_copies(&self, book_id: BookId) -> Result<Vec<BookCopy>> {
    let mut copies = self
      .store
      .find_available_copies(book_id)
      .await
      .map_err(Error::storage)?;
    copies.retain(BookCopy::is_lendable);
    Ok(copies)
  }

  // ── Acquisition and retirement ────────────────────────────────────────────

  pub async fn register_copy(
    &self,
    book_id: BookId,
    condition: String,
    location: String,
  ) -> Result<BookCopy> {
    let copy = BookCopy::acquire(book_id, condition, location, self.clock.today());
    let copy = self.store.save_copy(copy).await.map_err(Error::storage)?;
    tracing::info!(copy_id = %copy.copy_id, %book_id, "copy registered");
    Ok(copy)
  }

  /// Take a copy out of circulation for good. Loans keep pointing at it.
  pub async fn retire(&self, copy_id: CopyId) -> Result<BookCopy> {
    let copy = self.locks.copies.acquire(copy_id).await?;
    let outcome = async {
      let before = self.get_copy(copy.key()).await?;
      if before.retired {
        return Err(Error::invalid_state(Entity::Copy, copy_id, "retire", "RETIRED"));
      }
      if matches!(before.status, CopyStatus::CheckedOut | CopyStatus::Reserved) {
        return Err(Error::invalid_state(Entity::Copy, copy_id, "retire", before.status));
      }
      let mut after = before;
      after.retired = true;
      let after = self.store.save_copy(after).await.map_err(Error::storage)?;
      tracing::info!(%copy_id, "copy retired");
      Ok(after)
    }
    .await;
    settle(self, "retire", Journal::default(), outcome).await
  }

  // ── Status transitions ────────────────────────────────────────────────────

  /// AVAILABLE → CHECKED_OUT. Any other status, including RESERVED, fails.
  pub async fn try_reserve_for_checkout(&self, copy_id: CopyId) -> Result<BookCopy> {
    let copy = self.locks.copies.acquire(copy_id).await?;
    let mut journal = Journal::default();
    let outcome = self.check_out_held(&copy, &mut journal).await;
    settle(self, "try_reserve_for_checkout", journal, outcome).await
  }

  /// CHECKED_OUT → AVAILABLE, or RESERVED for the next hold in line.
  pub async fn release(&self, copy_id: CopyId) -> Result<BookCopy> {
    let book_id = self.get_copy(copy_id).await?.book_id;
    let book = self.locks.books.acquire(book_id).await?;
    let copy = self.locks.copies.acquire(copy_id).await?;
    let mut journal = Journal::default();
    let outcome = self
      .release_held(&book, &copy, &mut journal)
      .await
      .map(|(copy, _)| copy);
    settle(self, "release", journal, outcome).await
  }

  pub async fn mark_lost(&self, copy_id: CopyId) -> Result<BookCopy> {
    self.admin(copy_id, CopyEvent::MarkLost, "mark_lost").await
  }

  pub async fn mark_repair(&self, copy_id: CopyId) -> Result<BookCopy> {
    self.admin(copy_id, CopyEvent::MarkRepair, "mark_repair").await
  }

  /// IN_REPAIR or LOST → AVAILABLE, or RESERVED for the next hold in line.
  pub async fn return_to_service(&self, copy_id: CopyId) -> Result<BookCopy> {
    let book_id = self.get_copy(copy_id).await?.book_id;
    let book = self.locks.books.acquire(book_id).await?;
    let copy = self.locks.copies.acquire(copy_id).await?;
    let mut journal = Journal::default();
    let outcome = self
      .hand_off(&book, &copy, |held| CopyEvent::ReturnToService { held }, &mut journal)
      .await
      .map(|(copy, _)| copy);
    settle(self, "return_to_service", journal, outcome).await
  }

  // ── Under the copy lock ───────────────────────────────────────────────────

  pub(crate) async fn check_out_held(
    &self,
    copy: &Held<CopyId>,
    journal: &mut Journal,
  ) -> Result<BookCopy> {
    self.transition(copy, CopyEvent::CheckOut, journal).await
  }

  pub(crate) async fn collect_hold_held(
    &self,
    copy: &Held<CopyId>,
    journal: &mut Journal,
  ) -> Result<BookCopy> {
    self.transition(copy, CopyEvent::CollectHold, journal).await
  }

  pub(crate) async fn lose_on_loan_held(
    &self,
    copy: &Held<CopyId>,
    journal: &mut Journal,
  ) -> Result<BookCopy> {
    self.transition(copy, CopyEvent::LostOnLoan, journal).await
  }

  pub(crate) async fn release_held(
    &self,
    book: &Held<BookId>,
    copy: &Held<CopyId>,
    journal: &mut Journal,
  ) -> Result<(BookCopy, Option<Reservation>)> {
    self
      .hand_off(book, copy, |held| CopyEvent::CheckIn { held }, journal)
      .await
  }

  /// RESERVED copy whose hold was cancelled: pass it to the next hold or
  /// make it AVAILABLE.
  pub(crate) async fn release_hold_held(
    &self,
    book: &Held<BookId>,
    copy: &Held<CopyId>,
    journal: &mut Journal,
  ) -> Result<(BookCopy, Option<Reservation>)> {
    self
      .hand_off(book, copy, |held| CopyEvent::ReleaseHold { held }, journal)
      .await
  }

  /// Move a copy back into circulation, routing it to the reservation queue
  /// when someone is waiting for its book.
  async fn hand_off(
    &self,
    book: &Held<BookId>,
    copy: &Held<CopyId>,
    event: fn(bool) -> CopyEvent,
    journal: &mut Journal,
  ) -> Result<(BookCopy, Option<Reservation>)> {
    let held = self.queue.peek_next_held(book).await?.is_some();
    let after = self.transition(copy, event(held), journal).await?;
    let reservation = if held {
      self.queue.fulfill_held(book, copy.key(), journal).await?
    } else {
      None
    };
    Ok((after, reservation))
  }

  async fn admin(
    &self,
    copy_id: CopyId,
    event: CopyEvent,
    operation: &'static str,
  ) -> Result<BookCopy> {
    let book_id = self.get_copy(copy_id).await?.book_id;
    let book = self.locks.books.acquire(book_id).await?;
    let copy = self.locks.copies.acquire(copy_id).await?;
    let mut journal = Journal::default();

    let outcome = async {
      let was_reserved = self.get_copy(copy_id).await?.status == CopyStatus::Reserved;
      let after = self.transition(&copy, event, &mut journal).await?;
      if was_reserved {
        self.queue.revoke_hold_held(&book, copy_id, &mut journal).await?;
      }
      Ok(after)
    }
    .await;

    settle(self, operation, journal, outcome).await
  }

  async fn transition(
    &self,
    copy: &Held<CopyId>,
    event: CopyEvent,
    journal: &mut Journal,
  ) -> Result<BookCopy> {
    let before = self.get_copy(copy.key()).await?;
    let retired_block = before.retired
      && matches!(event, CopyEvent::CheckOut | CopyEvent::ReturnToService { .. });

    let next = before.status.next(event).filter(|_| !retired_block);
    let Some(status) = next else {
      let current = if before.retired { "RETIRED" } else { before.status.as_ref() };
      return Err(Error::invalid_state(
        Entity::Copy,
        copy.key(),
        event.verb(),
        current,
      ));
    };

    let from = before.status;
    let mut after = before.clone();
    after.status = status;
    journal.record(Undo::Copy(before));
    let after = self.store.save_copy(after).await.map_err(Error::storage)?;

    tracing::info!(copy_id = %copy.key(), %from, to = %status, "copy status changed");
    Ok(after)
  }
}

impl<C, R> Restore for CopyRegistry<C, R>
where
  C: BookCopyStore,
  R: ReservationStore,
{
  async fn restore(&self, undo: Undo) -> Result<()> {
    match undo {
      Undo::Copy(copy) => {
        self.store.save_copy(copy).await.map_err(Error::storage)?;
        Ok(())
      }
      Undo::Reservation(_) => self.queue.restore(undo).await,
      other => {
        tracing::error!(?other, "copy registry cannot restore this record");
        Ok(())
      }
    }
  }
}
