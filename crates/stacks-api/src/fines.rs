//! Handlers for `/fines` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/fines` | Body: `{"member_id":..,"reason":"DAMAGED_ITEM","amount":"4.00"}` |
//! | `GET`  | `/fines/{id}` | 404 if not found |
//! | `POST` | `/fines/{id}/waive` | |
//! | `POST` | `/fines/{id}/dispute` | Body: `{"reason":"..."}` |
//! | `POST` | `/fines/{id}/resolve` | Body: `{"upheld":true}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use stacks_core::{
  fine::{Fine, FineReason},
  id::{FineId, LoanId, MemberId},
  store::CirculationStore,
};

use crate::{SharedDesk, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct AssessBody {
  pub member_id: MemberId,
  pub loan_id:   Option<LoanId>,
  pub reason:    FineReason,
  pub amount:    Decimal,
}

/// `POST /fines`
pub async fn assess<S>(
  State(desk): State<SharedDesk<S>>,
  Json(body): Json<AssessBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CirculationStore + 'static,
{
  let fine = desk
    .ledger()
    .assess_fine(body.member_id, body.loan_id, body.reason, body.amount)
    .await?;
  Ok((StatusCode::CREATED, Json(fine)))
}

/// `GET /fines/{id}`
pub async fn get_one<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<FineId>,
) -> Result<Json<Fine>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.ledger().get_fine(id).await?))
}

/// `POST /fines/{id}/waive`
pub async fn waive<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<FineId>,
) -> Result<Json<Fine>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.ledger().waive(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct DisputeBody {
  pub reason: String,
}

/// `POST /fines/{id}/dispute`
pub async fn dispute<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<FineId>,
  Json(body): Json<DisputeBody>,
) -> Result<Json<Fine>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.ledger().dispute(id, body.reason).await?))
}

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
  pub upheld: bool,
}

/// `POST /fines/{id}/resolve`
pub async fn resolve<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<FineId>,
  Json(body): Json<ResolveBody>,
) -> Result<Json<Fine>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.ledger().resolve_dispute(id, body.upheld).await?))
}
