//! The circulation desk: checkout, renewal and return.
//!
//! The desk is the only writer of loan status and composes the ledger,
//! registry and queue under one lock discipline:
//!
//! 1. the member (fine balance, loan count, renewals),
//! 2. the book (reservation queue, copy selection),
//! 3. the copy.
//!
//! Eligibility checks run after the relevant locks are taken, so nothing can
//! change between the check and the write it guards.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use stacks_core::{
  BusinessRule, Entity, Error, Result,
  clock::Clock,
  copy::BookCopy,
  fine::{Fine, FineReason},
  id::{BookId, CopyId, LoanId, MemberId, ReservationId},
  loan::{Loan, Receipt, due_after},
  policy::CirculationPolicy,
  reservation::{Reservation, ReservationStatus},
  store::{BookCopyStore, CirculationStore, LoanStore, MemberFineStore, ReservationStore},
};

use crate::{
  journal::{Journal, Restore, Undo, settle},
  ledger::FineLedger,
  lock::{Held, Locks},
  queue::ReservationQueue,
  registry::CopyRegistry,
};

pub struct CirculationDesk<L, C, M, R> {
  loans:    Arc<L>,
  ledger:   FineLedger<M>,
  registry: CopyRegistry<C, R>,
  queue:    Arc<ReservationQueue<R>>,
  locks:    Arc<Locks>,
  clock:    Arc<dyn Clock>,
  policy:   Arc<CirculationPolicy>,
}

impl<S: CirculationStore> CirculationDesk<S, S, S, S> {
  /// A desk whose every collaborator is the same backend.
  pub fn over(store: Arc<S>, clock: Arc<dyn Clock>, policy: CirculationPolicy) -> Self {
    Self::new(store.clone(), store.clone(), store.clone(), store, clock, policy)
  }
}

impl<L, C, M, R> CirculationDesk<L, C, M, R>
where
  L: LoanStore,
  C: BookCopyStore,
  M: MemberFineStore,
  R: ReservationStore,
{
  pub fn new(
    loans: Arc<L>,
    copies: Arc<C>,
    members: Arc<M>,
    reservations: Arc<R>,
    clock: Arc<dyn Clock>,
    policy: CirculationPolicy,
  ) -> Self {
    let policy = Arc::new(policy);
    let locks = Arc::new(Locks::new(policy.lock_timeout()));
    let queue = Arc::new(ReservationQueue::new(
      reservations,
      locks.clone(),
      clock.clone(),
    ));
    Self {
      loans,
      ledger: FineLedger::new(members, locks.clone(), clock.clone(), policy.clone()),
      registry: CopyRegistry::new(copies, queue.clone(), locks.clone(), clock.clone()),
      queue,
      locks,
      clock,
      policy,
    }
  }

  pub fn ledger(&self) -> &FineLedger<M> { &self.ledger }

  pub fn registry(&self) -> &CopyRegistry<C, R> { &self.registry }

  pub fn queue(&self) -> &ReservationQueue<R> { &self.queue }

  pub fn policy(&self) -> &CirculationPolicy { &self.policy }

  pub fn today(&self) -> NaiveDate { self.clock.today() }

  #[cfg(test)]
  pub(crate) fn locks(&self) -> &Locks { &self.locks }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get_loan(&self, loan_id: LoanId) -> Result<Loan> {
    self
      .loans
      .find_loan(loan_id)
      .await
      .map_err(Error::storage)?
      .ok_or_else(|| Error::not_found(Entity::Loan, loan_id))
  }

  /// Every loan the member has had, returned or not.
  pub async fn loans_of(&self, member_id: MemberId) -> Result<Vec<Loan>> {
    self
      .loans
      .find_loans_by_member(member_id)
      .await
      .map_err(Error::storage)
  }

  pub async fn get_member_active_loans(&self, member_id: MemberId) -> Result<Vec<Loan>> {
    let mut loans = self.loans_of(member_id).await?;
    loans.retain(Loan::is_active);
    Ok(loans)
  }

  /// ACTIVE loans whose due date has passed as of today.
  pub async fn get_overdue_loans(&self) -> Result<Vec<Loan>> {
    self
      .loans
      .find_overdue_loans(self.clock.today())
      .await
      .map_err(Error::storage)
  }

  // ── Checkout ──────────────────────────────────────────────────────────────

  /// Lend a copy of `book_id` to `member_id`. A copy already set aside for
  /// the member by a reservation is used first.
  pub async fn checkout_book(
    &self,
    book_id: BookId,
    member_id: MemberId,
    loan_period_days: Option<u32>,
  ) -> Result<Loan> {
    let period = loan_period_days.unwrap_or(self.policy.loan_period_days);
    let member = self.locks.members.acquire(member_id).await?;
    let mut journal = Journal::default();
    let outcome = self.checkout_held(&member, book_id, period, &mut journal).await;
    settle(self, "checkout_book", journal, outcome).await
  }

  async fn checkout_held(
    &self,
    member: &Held<MemberId>,
    book_id: BookId,
    period: u32,
    journal: &mut Journal,
  ) -> Result<Loan> {
    // Refused before any copy moves.
    let today = self.clock.today();
    due_after(today, period)?;

    self.ensure_borrower(member.key()).await?;
    if self.ledger.has_outstanding_held(member).await? {
      return Err(BusinessRule::OutstandingFines.into());
    }
    let active = self.get_member_active_loans(member.key()).await?.len();
    if active >= self.policy.max_loans_per_member {
      return Err(BusinessRule::LoanLimit.into());
    }

    let book = self.locks.books.acquire(book_id).await?;
    let open = self.queue.open_for_held(&book, member.key()).await?;
    let held_copy = open
      .as_ref()
      .filter(|r| r.status == ReservationStatus::ReadyForPickup)
      .and_then(|r| r.copy_id);

    let copy = match held_copy {
      Some(copy_id) => {
        let copy = self.locks.copies.acquire(copy_id).await?;
        self.registry.collect_hold_held(&copy, journal).await?;
        copy
      }
      None => self.claim_available(&book, journal).await?,
    };
    if let Some(reservation) = &open {
      self
        .queue
        .complete_held(&book, reservation.reservation_id, journal)
        .await?;
    }

    let loan = Loan::open(member.key(), copy.key(), book_id, today, period)?;
    let loan = self.loans.save_loan(loan).await.map_err(Error::storage)?;

    tracing::info!(
      loan_id = %loan.loan_id,
      copy_id = %loan.copy_id,
      due_date = %loan.due_date,
      from_hold = held_copy.is_some(),
      "book checked out"
    );
    Ok(loan)
  }

  /// Check out the first lendable copy of the book. The copy lock is kept
  /// until the loan is written.
  async fn claim_available(
    &self,
    book: &Held<BookId>,
    journal: &mut Journal,
  ) -> Result<Held<CopyId>> {
    for candidate in self.registry.available_copies(book.key()).await? {
      let copy = self.locks.copies.acquire(candidate.copy_id).await?;
      match self.registry.check_out_held(&copy, journal).await {
        Ok(_) => return Ok(copy),
        // Sent to repair or marked lost since the listing was read.
        Err(Error::InvalidState { .. }) => continue,
        Err(error) => return Err(error),
      }
    }
    Err(BusinessRule::NoAvailableCopies.into())
  }

  // ── Renewal ───────────────────────────────────────────────────────────────

  pub async fn renew_loan(&self, loan_id: LoanId) -> Result<Loan> {
    let member_id = self.get_loan(loan_id).await?.member_id;
    let member = self.locks.members.acquire(member_id).await?;
    let outcome = self.renew_held(&member, loan_id).await;
    settle(self, "renew_loan", Journal::default(), outcome).await
  }

  async fn renew_held(&self, member: &Held<MemberId>, loan_id: LoanId) -> Result<Loan> {
    let mut loan = self.get_loan(loan_id).await?;
    if !loan.is_active() {
      return Err(Error::invalid_state(Entity::Loan, loan_id, "renew", loan.status));
    }
    if self.ledger.has_outstanding_held(member).await? {
      return Err(BusinessRule::OutstandingFines.into());
    }
    if loan.renewal_count >= self.policy.max_renewals {
      return Err(BusinessRule::MaxRenewals.into());
    }

    loan.renew(self.policy.loan_period_days)?;
    let loan = self.loans.save_loan(loan).await.map_err(Error::storage)?;
    tracing::info!(
      %loan_id,
      due_date = %loan.due_date,
      renewal_count = loan.renewal_count,
      "loan renewed"
    );
    Ok(loan)
  }

  // ── Return ────────────────────────────────────────────────────────────────

  /// Close the loan, charge any overdue fine and put the copy back into
  /// circulation (or aside for the next reservation).
  pub async fn return_book(&self, loan_id: LoanId) -> Result<Receipt> {
    let (member, book, copy) = self.lock_loan(loan_id).await?;
    let mut journal = Journal::default();
    let outcome = self
      .return_held(&member, &book, &copy, loan_id, &mut journal)
      .await;
    settle(self, "return_book", journal, outcome).await
  }

  async fn return_held(
    &self,
    member: &Held<MemberId>,
    book: &Held<BookId>,
    copy: &Held<CopyId>,
    loan_id: LoanId,
    journal: &mut Journal,
  ) -> Result<Receipt> {
    let before = self.get_loan(loan_id).await?;
    if !before.is_active() {
      return Err(Error::invalid_state(Entity::Loan, loan_id, "return", before.status));
    }

    let today = self.clock.today();
    let days_overdue = before.overdue_days(today);
    let mut loan = before.clone();
    loan.close_returned(today);
    journal.record(Undo::Loan(before));
    self.loans.save_loan(loan).await.map_err(Error::storage)?;

    let (_, hold) = self.registry.release_held(book, copy, journal).await?;

    let fine = self
      .ledger
      .assess_overdue_held(member, loan_id, days_overdue, self.policy.daily_rate, journal)
      .await?;
    let fine_charged = fine.as_ref().map_or(Decimal::ZERO, |f| f.amount);

    let description = if fine_charged > Decimal::ZERO {
      format!("Returned copy {} {days_overdue} day(s) late, fine {fine_charged}", copy.key())
    } else {
      format!("Returned copy {} on time", copy.key())
    };

    tracing::info!(
      %loan_id,
      days_overdue,
      %fine_charged,
      held_for = ?hold.as_ref().map(|r| r.reservation_id),
      "book returned"
    );

    Ok(Receipt {
      loan_id,
      member_id: member.key(),
      copy_id: copy.key(),
      returned_on: today,
      days_overdue,
      fine_charged,
      fine_id: fine.map(|f| f.fine_id),
      held_for: hold.map(|r| r.reservation_id),
      description,
    })
  }

  // ── Loss ──────────────────────────────────────────────────────────────────

  /// Write off a copy that will not come back: the loan becomes LOST, the
  /// copy LOST, and the member is charged the replacement cost.
  pub async fn mark_loan_lost(&self, loan_id: LoanId) -> Result<Loan> {
    let (member, _book, copy) = self.lock_loan(loan_id).await?;
    let mut journal = Journal::default();
    let outcome = self.lose_held(&member, &copy, loan_id, &mut journal).await;
    settle(self, "mark_loan_lost", journal, outcome).await
  }

  async fn lose_held(
    &self,
    member: &Held<MemberId>,
    copy: &Held<CopyId>,
    loan_id: LoanId,
    journal: &mut Journal,
  ) -> Result<Loan> {
    let before = self.get_loan(loan_id).await?;
    if !before.is_active() {
      return Err(Error::invalid_state(Entity::Loan, loan_id, "mark lost", before.status));
    }

    let mut loan = before.clone();
    loan.close_lost();
    journal.record(Undo::Loan(before));
    let loan = self.loans.save_loan(loan).await.map_err(Error::storage)?;

    self.registry.lose_on_loan_held(copy, journal).await?;

    let charge = self.policy.lost_item_charge;
    if charge > Decimal::ZERO {
      let fine = Fine::issue(
        member.key(),
        Some(loan_id),
        FineReason::LostItem,
        charge,
        self.clock.now(),
        self.policy.fine_due_days,
      );
      self.ledger.charge_held(member, fine, journal).await?;
    }

    tracing::info!(%loan_id, copy_id = %copy.key(), %charge, "loan written off as lost");
    Ok(loan)
  }

  // ── Overdue sweep ─────────────────────────────────────────────────────────

  /// Charge overdue fines on every loan still out past its due date.
  ///
  /// A loan's fine is issued on the first sweep and brought up to date on
  /// later ones; the return settles the final amount. Loans whose member is
  /// busy are left for the next sweep. Returns the current overdue fine of
  /// every loan swept.
  pub async fn process_overdue(&self) -> Result<Vec<Fine>> {
    let mut assessed = Vec::new();
    for loan in self.get_overdue_loans().await? {
      let member = match self.locks.members.acquire(loan.member_id).await {
        Ok(member) => member,
        Err(Error::ConcurrencyConflict { .. }) => continue,
        Err(error) => return Err(error),
      };
      let mut journal = Journal::default();
      let outcome = self.sweep_held(&member, loan.loan_id, &mut journal).await;
      if let Some(fine) = settle(self, "process_overdue", journal, outcome).await? {
        assessed.push(fine);
      }
    }
    tracing::info!(assessed = assessed.len(), "overdue sweep finished");
    Ok(assessed)
  }

  async fn sweep_held(
    &self,
    member: &Held<MemberId>,
    loan_id: LoanId,
    journal: &mut Journal,
  ) -> Result<Option<Fine>> {
    // Returned since the listing was read.
    let loan = self.get_loan(loan_id).await?;
    if !loan.is_active() {
      return Ok(None);
    }
    let days = loan.overdue_days(self.clock.today());
    self
      .ledger
      .assess_overdue_held(member, loan_id, days, self.policy.daily_rate, journal)
      .await
  }

  // ── Reservations ──────────────────────────────────────────────────────────

  pub async fn place_reservation(
    &self,
    member_id: MemberId,
    book_id: BookId,
  ) -> Result<Reservation> {
    self.ensure_borrower(member_id).await?;
    self.queue.enqueue(member_id, book_id).await
  }

  /// Cancel a reservation. A copy it was holding goes to the next member in
  /// line, or back on the shelf.
  pub async fn cancel_reservation(
    &self,
    reservation_id: ReservationId,
  ) -> Result<Reservation> {
    let book_id = self.queue.get(reservation_id).await?.book_id;
    let book = self.locks.books.acquire(book_id).await?;
    let mut journal = Journal::default();

    let outcome = async {
      let cancelled = self
        .queue
        .cancel_held(&book, reservation_id, &mut journal)
        .await?;
      if let Some(copy_id) = cancelled.copy_id {
        let copy = self.locks.copies.acquire(copy_id).await?;
        self
          .registry
          .release_hold_held(&book, &copy, &mut journal)
          .await?;
      }
      Ok(cancelled)
    }
    .await;

    settle(self, "cancel_reservation", journal, outcome).await
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  async fn ensure_borrower(&self, member_id: MemberId) -> Result<()> {
    if self.ledger.account(member_id).await?.can_borrow() {
      Ok(())
    } else {
      Err(BusinessRule::NotABorrower.into())
    }
  }

  /// Take the member, book and copy locks a loan touches, in lock order.
  async fn lock_loan(
    &self,
    loan_id: LoanId,
  ) -> Result<(Held<MemberId>, Held<BookId>, Held<CopyId>)> {
    let loan = self.get_loan(loan_id).await?;
    let member = self.locks.members.acquire(loan.member_id).await?;
    let book = self.locks.books.acquire(loan.book_id).await?;
    let copy = self.locks.copies.acquire(loan.copy_id).await?;
    Ok((member, book, copy))
  }

  /// Register a newly acquired copy.
  pub async fn register_copy(
    &self,
    book_id: BookId,
    condition: String,
    location: String,
  ) -> Result<BookCopy> {
    self.registry.register_copy(book_id, condition, location).await
  }
}

impl<L, C, M, R> Restore for CirculationDesk<L, C, M, R>
where
  L: LoanStore,
  C: BookCopyStore,
  M: MemberFineStore,
  R: ReservationStore,
{
  async fn restore(&self, undo: Undo) -> Result<()> {
    match undo {
      Undo::Loan(loan) => {
        self.loans.save_loan(loan).await.map_err(Error::storage)?;
        Ok(())
      }
      Undo::Copy(_) | Undo::Reservation(_) => self.registry.restore(undo).await,
      Undo::Fine(_) | Undo::Balance { .. } => self.ledger.restore(undo).await,
    }
  }
}
