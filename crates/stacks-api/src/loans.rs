//! Handlers for `/loans` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/loans` | Body: `{"book_id":..,"member_id":..,"loan_period_days":14}` |
//! | `GET`  | `/loans/overdue` | ACTIVE loans past their due date |
//! | `POST` | `/loans/overdue` | Charges or updates their overdue fines |
//! | `GET`  | `/loans/{id}` | 404 if not found |
//! | `POST` | `/loans/{id}/renew` | |
//! | `POST` | `/loans/{id}/return` | Returns a receipt |
//! | `POST` | `/loans/{id}/lost` | Writes the copy off and charges for it |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use stacks_core::{
  fine::Fine,
  id::{BookId, LoanId, MemberId},
  loan::{Loan, LoanStatus, Receipt},
  store::CirculationStore,
};

use crate::{SharedDesk, error::ApiError};

/// A loan as reported to clients: the stored record plus what its status
/// looks like today.
#[derive(Debug, Serialize)]
pub struct LoanView {
  #[serde(flatten)]
  pub loan:            Loan,
  pub observed_status: LoanStatus,
}

impl LoanView {
  pub(crate) fn new<S: CirculationStore>(desk: &SharedDesk<S>, loan: Loan) -> Self {
    let observed_status = loan.observed_status(desk.today());
    Self { loan, observed_status }
  }
}

// ─── Checkout ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
  pub book_id:          BookId,
  pub member_id:        MemberId,
  pub loan_period_days: Option<u32>,
}

/// `POST /loans`
pub async fn checkout<S>(
  State(desk): State<SharedDesk<S>>,
  Json(body): Json<CheckoutBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CirculationStore + 'static,
{
  let loan = desk
    .checkout_book(body.book_id, body.member_id, body.loan_period_days)
    .await?;
  Ok((StatusCode::CREATED, Json(LoanView::new(&desk, loan))))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /loans/{id}`
pub async fn get_one<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<LoanId>,
) -> Result<Json<LoanView>, ApiError>
where
  S: CirculationStore + 'static,
{
  let loan = desk.get_loan(id).await?;
  Ok(Json(LoanView::new(&desk, loan)))
}

/// `GET /loans/overdue`
pub async fn overdue<S>(
  State(desk): State<SharedDesk<S>>,
) -> Result<Json<Vec<LoanView>>, ApiError>
where
  S: CirculationStore + 'static,
{
  let loans = desk.get_overdue_loans().await?;
  Ok(Json(
    loans.into_iter().map(|l| LoanView::new(&desk, l)).collect(),
  ))
}

/// `POST /loans/overdue`
pub async fn process_overdue<S>(
  State(desk): State<SharedDesk<S>>,
) -> Result<Json<Vec<Fine>>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.process_overdue().await?))
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

/// `POST /loans/{id}/renew`
pub async fn renew<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<LoanId>,
) -> Result<Json<LoanView>, ApiError>
where
  S: CirculationStore + 'static,
{
  let loan = desk.renew_loan(id).await?;
  Ok(Json(LoanView::new(&desk, loan)))
}

/// `POST /loans/{id}/return`
pub async fn return_one<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<LoanId>,
) -> Result<Json<Receipt>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.return_book(id).await?))
}

/// `POST /loans/{id}/lost`
pub async fn mark_lost<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<LoanId>,
) -> Result<Json<LoanView>, ApiError>
where
  S: CirculationStore + 'static,
{
  let loan = desk.mark_loan_lost(id).await?;
  Ok(Json(LoanView::new(&desk, loan)))
}
