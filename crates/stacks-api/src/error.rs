//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! | Error                 | Status |
//! |-----------------------|--------|
//! | business rule         | 422    |
//! | not found             | 404    |
//! | invalid state         | 409    |
//! | concurrency conflict  | 409    |
//! | storage               | 500    |

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use stacks_core::Error;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Circulation(#[from] Error),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Circulation(e) => match e {
        Error::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::InvalidState { .. } | Error::ConcurrencyConflict { .. } => {
          StatusCode::CONFLICT
        }
        Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::Circulation(e @ Error::Storage(_)) => {
        tracing::error!(error = %e, "request failed on storage");
        "internal storage error".to_owned()
      }
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
