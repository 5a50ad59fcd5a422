//! Handlers for `/members` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/members` | Body: `{"name":"Ada","role":"borrower"}` |
//! | `GET`  | `/members/{id}` | 404 if not found |
//! | `GET`  | `/members/{id}/loans` | Optional `?active=true` |
//! | `GET`  | `/members/{id}/fines` | |
//! | `GET`  | `/members/{id}/balance` | |
//! | `POST` | `/members/{id}/payments` | Body: `{"amount":"2.50"}` |
//! | `GET`  | `/members/{id}/reservations` | |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stacks_core::{
  account::{Account, AccountRole},
  fine::Fine,
  id::MemberId,
  reservation::Reservation,
  store::CirculationStore,
};

use crate::{SharedDesk, error::ApiError, loans::LoanView};

// ─── Accounts ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name: String,
  #[serde(default = "default_role")]
  pub role: AccountRole,
}

fn default_role() -> AccountRole { AccountRole::Borrower }

/// `POST /members`
pub async fn create<S>(
  State(desk): State<SharedDesk<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CirculationStore + 'static,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  let account = desk.ledger().open_account(body.name, body.role).await?;
  Ok((StatusCode::CREATED, Json(account)))
}

/// `GET /members/{id}`
pub async fn get_one<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<MemberId>,
) -> Result<Json<Account>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.ledger().account(id).await?))
}

// ─── Loans ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoansParams {
  #[serde(default)]
  pub active: bool,
}

/// `GET /members/{id}/loans[?active=true]`
pub async fn loans<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<MemberId>,
  Query(params): Query<LoansParams>,
) -> Result<Json<Vec<LoanView>>, ApiError>
where
  S: CirculationStore + 'static,
{
  desk.ledger().account(id).await?;
  let loans = if params.active {
    desk.get_member_active_loans(id).await?
  } else {
    desk.loans_of(id).await?
  };
  Ok(Json(
    loans.into_iter().map(|l| LoanView::new(&desk, l)).collect(),
  ))
}

// ─── Fines and balance ───────────────────────────────────────────────────────

/// `GET /members/{id}/fines`
pub async fn fines<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<MemberId>,
) -> Result<Json<Vec<Fine>>, ApiError>
where
  S: CirculationStore + 'static,
{
  desk.ledger().account(id).await?;
  Ok(Json(desk.ledger().fines_of(id).await?))
}

#[derive(Debug, Serialize)]
pub struct BalanceView {
  pub member_id:   MemberId,
  pub balance:     Decimal,
  pub outstanding: bool,
}

/// `GET /members/{id}/balance`
pub async fn balance<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<MemberId>,
) -> Result<Json<BalanceView>, ApiError>
where
  S: CirculationStore + 'static,
{
  let balance = desk.ledger().account(id).await?.fine_balance;
  Ok(Json(BalanceView {
    member_id: id,
    balance,
    outstanding: balance > Decimal::ZERO,
  }))
}

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
  pub amount: Decimal,
}

/// `POST /members/{id}/payments`
pub async fn pay<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<MemberId>,
  Json(body): Json<PaymentBody>,
) -> Result<Json<BalanceView>, ApiError>
where
  S: CirculationStore + 'static,
{
  let balance = desk.ledger().pay(id, body.amount).await?;
  Ok(Json(BalanceView {
    member_id: id,
    balance,
    outstanding: balance > Decimal::ZERO,
  }))
}

// ─── Reservations ────────────────────────────────────────────────────────────

/// `GET /members/{id}/reservations`
pub async fn reservations<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<MemberId>,
) -> Result<Json<Vec<Reservation>>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.queue().reservations_of(id).await?))
}
