//! Handlers for book copy endpoints: acquisition, lookup and the
//! administrative status actions.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use stacks_core::{
  copy::BookCopy,
  id::{BookId, CopyId},
  store::CirculationStore,
};

use crate::{SharedDesk, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub condition: String,
  pub location:  String,
}

/// `POST /books/{id}/copies`
pub async fn register<S>(
  State(desk): State<SharedDesk<S>>,
  Path(book_id): Path<BookId>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CirculationStore + 'static,
{
  let copy = desk
    .register_copy(book_id, body.condition, body.location)
    .await?;
  Ok((StatusCode::CREATED, Json(copy)))
}

/// `GET /books/{id}/copies`
pub async fn list_for_book<S>(
  State(desk): State<SharedDesk<S>>,
  Path(book_id): Path<BookId>,
) -> Result<Json<Vec<BookCopy>>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.registry().copies_of(book_id).await?))
}

/// `GET /copies/{id}`
pub async fn get_one<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<CopyId>,
) -> Result<Json<BookCopy>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.registry().get_copy(id).await?))
}

/// `POST /copies/{id}/lost`
pub async fn mark_lost<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<CopyId>,
) -> Result<Json<BookCopy>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.registry().mark_lost(id).await?))
}

/// `POST /copies/{id}/repair`
pub async fn mark_repair<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<CopyId>,
) -> Result<Json<BookCopy>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.registry().mark_repair(id).await?))
}

/// `POST /copies/{id}/restore`
pub async fn return_to_service<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<CopyId>,
) -> Result<Json<BookCopy>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.registry().return_to_service(id).await?))
}

/// `POST /copies/{id}/retire`
pub async fn retire<S>(
  State(desk): State<SharedDesk<S>>,
  Path(id): Path<CopyId>,
) -> Result<Json<BookCopy>, ApiError>
where
  S: CirculationStore + 'static,
{
  Ok(Json(desk.registry().retire(id).await?))
}
