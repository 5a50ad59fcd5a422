//! The fine ledger: the only writer of fines and member balances.
//!
//! A member's stored `fine_balance` always equals the outstanding amount of
//! their PENDING fines. Every change to a fine goes through
//! [`FineLedger::rewrite_held`], which moves the balance by exactly the
//! change in that fine's balance share, under the member's lock.

use std::sync::Arc;

use rust_decimal::Decimal;
use stacks_core::{
  BusinessRule, Entity, Error, Result,
  account::{Account, AccountRole},
  clock::Clock,
  fine::{Fine, FineReason, FineStatus},
  id::{FineId, LoanId, MemberId},
  policy::CirculationPolicy,
  store::MemberFineStore,
};

use crate::{
  journal::{Journal, Restore, Undo, settle},
  lock::{Held, Locks},
};

pub struct FineLedger<M> {
  store:  Arc<M>,
  locks:  Arc<Locks>,
  clock:  Arc<dyn Clock>,
  policy: Arc<CirculationPolicy>,
}

impl<M: MemberFineStore> FineLedger<M> {
  pub fn new(
    store: Arc<M>,
    locks: Arc<Locks>,
    clock: Arc<dyn Clock>,
    policy: Arc<CirculationPolicy>,
  ) -> Self {
    Self { store, locks, clock, policy }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn account(&self, member_id: MemberId) -> Result<Account> {
    self
      .store
      .find_account(member_id)
      .await
      .map_err(Error::storage)?
      .ok_or_else(|| Error::not_found(Entity::Member, member_id))
  }

  pub async fn balance(&self, member_id: MemberId) -> Result<Decimal> {
    self.store.get_balance(member_id).await.map_err(Error::storage)
  }

  /// True iff the member owes anything on PENDING fines. Disputed fines do
  /// not count until the dispute is resolved.
  pub async fn has_outstanding_balance(&self, member_id: MemberId) -> Result<bool> {
    Ok(self.balance(member_id).await? > Decimal::ZERO)
  }

  pub async fn fines_of(&self, member_id: MemberId) -> Result<Vec<Fine>> {
    self
      .store
      .find_fines_by_member(member_id)
      .await
      .map_err(Error::storage)
  }

  pub async fn get_fine(&self, fine_id: FineId) -> Result<Fine> {
    self
      .store
      .find_fine(fine_id)
      .await
      .map_err(Error::storage)?
      .ok_or_else(|| Error::not_found(Entity::Fine, fine_id))
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Open a new account with a zero balance.
  pub async fn open_account(&self, name: String, role: AccountRole) -> Result<Account> {
    let account = Account::new(name, role, self.clock.today());
    let account = self
      .store
      .save_account(account)
      .await
      .map_err(Error::storage)?;
    tracing::info!(member_id = %account.member_id, role = %account.role, "account opened");
    Ok(account)
  }

  /// Charge `overdue_days * daily_rate` against a loan. Reassessing a loan
  /// updates its existing overdue fine instead of adding another. Returns
  /// `None` when nothing is owed and nothing was recorded before.
  pub async fn assess_overdue_fine(
    &self,
    member_id: MemberId,
    loan_id: LoanId,
    overdue_days: i64,
    daily_rate: Decimal,
  ) -> Result<Option<Fine>> {
    self.account(member_id).await?;
    let member = self.locks.members.acquire(member_id).await?;
    let mut journal = Journal::default();
    let outcome = self
      .assess_overdue_held(&member, loan_id, overdue_days, daily_rate, &mut journal)
      .await;
    settle(self, "assess_overdue_fine", journal, outcome).await
  }

  /// Charge a damage, lost-item or administrative fine.
  pub async fn assess_fine(
    &self,
    member_id: MemberId,
    loan_id: Option<LoanId>,
    reason: FineReason,
    amount: Decimal,
  ) -> Result<Fine> {
    if amount <= Decimal::ZERO {
      return Err(BusinessRule::InvalidAmount.into());
    }
    self.account(member_id).await?;
    let member = self.locks.members.acquire(member_id).await?;
    let mut journal = Journal::default();
    let fine = Fine::issue(
      member_id,
      loan_id,
      reason,
      amount,
      self.clock.now(),
      self.policy.fine_due_days,
    );
    let outcome = self.charge_held(&member, fine, &mut journal).await;
    settle(self, "assess_fine", journal, outcome).await
  }

  /// Apply a payment to the member's oldest PENDING fines first (issue date,
  /// then recording time) and return the new balance.
  pub async fn pay(&self, member_id: MemberId, amount: Decimal) -> Result<Decimal> {
    self.account(member_id).await?;
    let member = self.locks.members.acquire(member_id).await?;
    let mut journal = Journal::default();
    let outcome = self.pay_held(&member, amount, &mut journal).await;
    settle(self, "pay", journal, outcome).await
  }

  /// PENDING or DISPUTED → WAIVED.
  pub async fn waive(&self, fine_id: FineId) -> Result<Fine> {
    self
      .restate(fine_id, "waive", |fine| match fine.status {
        FineStatus::Pending | FineStatus::Disputed => {
          fine.status = FineStatus::Waived;
          true
        }
        _ => false,
      })
      .await
  }

  /// PENDING → DISPUTED. The fine stops counting toward the balance until
  /// the dispute is resolved.
  pub async fn dispute(&self, fine_id: FineId, reason: String) -> Result<Fine> {
    self
      .restate(fine_id, "dispute", move |fine| {
        if fine.status != FineStatus::Pending {
          return false;
        }
        fine.status = FineStatus::Disputed;
        fine.note = Some(reason);
        true
      })
      .await
  }

  /// DISPUTED → PENDING when the charge is upheld, WAIVED otherwise.
  pub async fn resolve_dispute(&self, fine_id: FineId, upheld: bool) -> Result<Fine> {
    self
      .restate(fine_id, "resolve the dispute on", |fine| {
        if fine.status != FineStatus::Disputed {
          return false;
        }
        fine.status = if upheld { FineStatus::Pending } else { FineStatus::Waived };
        true
      })
      .await
  }

  // ── Under the member lock ─────────────────────────────────────────────────

  pub(crate) async fn has_outstanding_held(&self, member: &Held<MemberId>) -> Result<bool> {
    self.has_outstanding_balance(member.key()).await
  }

  pub(crate) async fn assess_overdue_held(
    &self,
    member: &Held<MemberId>,
    loan_id: LoanId,
    overdue_days: i64,
    daily_rate: Decimal,
    journal: &mut Journal,
  ) -> Result<Option<Fine>> {
    let amount = if overdue_days > 0 {
      Decimal::from(overdue_days) * daily_rate
    } else {
      Decimal::ZERO
    };

    let existing = self
      .store
      .find_fines_by_loan(loan_id)
      .await
      .map_err(Error::storage)?
      .into_iter()
      .find(|f| f.reason == FineReason::Overdue);

    match existing {
      Some(fine) if fine.status.is_settled() => Ok(Some(fine)),
      Some(fine) => {
        let amount = amount.max(fine.amount_paid);
        if amount == fine.amount {
          return Ok(Some(fine));
        }
        let mut updated = fine.clone();
        updated.amount = amount;
        if updated.outstanding().is_zero() && updated.status == FineStatus::Pending {
          updated.status = if updated.amount_paid.is_zero() {
            FineStatus::Waived
          } else {
            FineStatus::Paid
          };
        }
        self.rewrite_held(member, fine, updated, journal).await.map(Some)
      }
      None if amount.is_zero() => Ok(None),
      None => {
        let fine = Fine::issue(
          member.key(),
          Some(loan_id),
          FineReason::Overdue,
          amount,
          self.clock.now(),
          self.policy.fine_due_days,
        );
        self.charge_held(member, fine, journal).await.map(Some)
      }
    }
  }

  /// Record a brand-new fine. The balance moves first so that a failed
  /// insert can be compensated; the insert itself is the last write.
  pub(crate) async fn charge_held(
    &self,
    member: &Held<MemberId>,
    fine: Fine,
    journal: &mut Journal,
  ) -> Result<Fine> {
    self.adjust_balance_held(member, fine.balance_share(), journal).await?;
    let fine = self.store.save_fine(fine).await.map_err(Error::storage)?;
    tracing::info!(
      member_id = %fine.member_id,
      fine_id = %fine.fine_id,
      reason = %fine.reason,
      amount = %fine.amount,
      "fine issued"
    );
    Ok(fine)
  }

  async fn pay_held(
    &self,
    member: &Held<MemberId>,
    amount: Decimal,
    journal: &mut Journal,
  ) -> Result<Decimal> {
    let balance = self.balance(member.key()).await?;
    if amount <= Decimal::ZERO || amount > balance {
      return Err(BusinessRule::InvalidAmount.into());
    }

    let mut pending: Vec<Fine> = self
      .fines_of(member.key())
      .await?
      .into_iter()
      .filter(|f| f.status == FineStatus::Pending && f.outstanding() > Decimal::ZERO)
      .collect();
    pending.sort_by_key(|f| (f.issue_date, f.recorded_at));

    let mut remaining = amount;
    for fine in pending {
      if remaining.is_zero() {
        break;
      }
      let applied = remaining.min(fine.outstanding());
      let mut paid = fine.clone();
      paid.amount_paid += applied;
      if paid.outstanding().is_zero() {
        paid.status = FineStatus::Paid;
      }
      remaining -= applied;
      self.rewrite_held(member, fine, paid, journal).await?;
    }

    if !remaining.is_zero() {
      tracing::warn!(
        member_id = %member.key(),
        unapplied = %remaining,
        "stored balance exceeded pending fines"
      );
    }

    let balance = self.balance(member.key()).await?;
    tracing::info!(member_id = %member.key(), %amount, %balance, "payment applied");
    Ok(balance)
  }

  /// Overwrite a fine, moving the balance by the change in its share.
  async fn rewrite_held(
    &self,
    member: &Held<MemberId>,
    before: Fine,
    after: Fine,
    journal: &mut Journal,
  ) -> Result<Fine> {
    let delta = after.balance_share() - before.balance_share();
    self.adjust_balance_held(member, delta, journal).await?;
    journal.record(Undo::Fine(before));
    self.store.save_fine(after).await.map_err(Error::storage)
  }

  async fn adjust_balance_held(
    &self,
    member: &Held<MemberId>,
    delta: Decimal,
    journal: &mut Journal,
  ) -> Result<()> {
    if delta.is_zero() {
      return Ok(());
    }
    self
      .store
      .update_balance(member.key(), delta)
      .await
      .map_err(Error::storage)?;
    journal.record(Undo::Balance { member_id: member.key(), delta: -delta });
    Ok(())
  }

  /// Apply an administrative status change to a fine under its owner's lock.
  /// `change` returns false when the fine's current status does not allow it.
  async fn restate(
    &self,
    fine_id: FineId,
    attempted: &'static str,
    change: impl FnOnce(&mut Fine) -> bool + Send,
  ) -> Result<Fine> {
    let owner = self.get_fine(fine_id).await?.member_id;
    let member = self.locks.members.acquire(owner).await?;
    let mut journal = Journal::default();

    let outcome = async {
      let before = self.get_fine(fine_id).await?;
      let mut after = before.clone();
      if !change(&mut after) {
        return Err(Error::invalid_state(
          Entity::Fine,
          fine_id,
          attempted,
          before.status,
        ));
      }
      let fine = self.rewrite_held(&member, before, after, &mut journal).await?;
      tracing::info!(%fine_id, status = %fine.status, "fine status changed");
      Ok(fine)
    }
    .await;

    settle(self, attempted, journal, outcome).await
  }
}

impl<M: MemberFineStore> Restore for FineLedger<M> {
  async fn restore(&self, undo: Undo) -> Result<()> {
    match undo {
      Undo::Fine(fine) => {
        self.store.save_fine(fine).await.map_err(Error::storage)?;
      }
      Undo::Balance { member_id, delta } => {
        self
          .store
          .update_balance(member_id, delta)
          .await
          .map_err(Error::storage)?;
      }
      other => {
        tracing::error!(?other, "fine ledger cannot restore this record");
      }
    }
    Ok(())
  }
}
