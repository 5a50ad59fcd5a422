//! Handlers for reservation endpoints.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use stacks_core::{
  id::{BookId, MemberId, ReservationId},
  reservation::Reservation,
  store::CirculationStore,
};

use crate::{SharedDesk, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct PlaceBody {
  pub member_id: MemberId,
  pub book_id:   BookId,
}

/// `POST /reservations`
pub async fn place<S>(
  State(desk): State<SharedDesk<S>>,
  Json(body): Json<PlaceBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CirculationStore + 'static,
{
  let reservation = desk.place_reservation(body.member_id, body.book_id).await?;
  Ok((StatusCode::CREATED, Json(reservation)))
}

/// `GET /reservations/{id}`
pub async fn get_one<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<ReservationId>,
) -> Result<Json<Reservation>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.queue().get(id).await?))
}

/// `POST /reservations/{id}/cancel`
pub async fn cancel<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<ReservationId>,
) -> Result<Json<Reservation>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.cancel_reservation(id).await?))
}

/// `GET /books/{id}/reservations`, in queue order.
pub async fn list_for_book<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<BookId>,
) -> Result<Json<Vec<Reservation>>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.queue().reservations_for(id).await?))
}
