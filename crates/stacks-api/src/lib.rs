//! JSON REST API for the Stacks circulation desk.
//!
//! Exposes an axum [`Router`] backed by a [`CirculationDesk`] over any
//! [`CirculationStore`]. Auth, TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", stacks_api::api_router(desk.clone()))
//! ```

pub mod copies;
pub mod error;
pub mod fines;
pub mod loans;
pub mod members;
pub mod reservations;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use stacks_circulation::CirculationDesk;
use stacks_core::store::CirculationStore;

pub use error::ApiError;

/// The desk shared by every handler, with one backend behind all four
/// stores.
pub type SharedDesk<S> = Arc<CirculationDesk<S, S, S, S>>;

/// Build a fully-materialised API router for `desk`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(desk: SharedDesk<S>) -> Router<()>
where
  S: CirculationStore + 'static,
{
  Router::new()
    // Loans
    .route("/loans", post(loans::checkout::<S>))
    .route(
      "/loans/overdue",
      get(loans::overdue::<S>).post(loans::process_overdue::<S>),
    )
    .route("/loans/{id}", get(loans::get_one::<S>))
    .route("/loans/{id}/renew", post(loans::renew::<S>))
    .route("/loans/{id}/return", post(loans::return_one::<S>))
    .route("/loans/{id}/lost", post(loans::mark_lost::<S>))
    // Members
    .route("/members", post(members::create::<S>))
    .route("/members/{id}", get(members::get_one::<S>))
    .route("/members/{id}/loans", get(members::loans::<S>))
    .route("/members/{id}/fines", get(members::fines::<S>))
    .route("/members/{id}/balance", get(members::balance::<S>))
    .route("/members/{id}/payments", post(members::pay::<S>))
    .route("/members/{id}/reservations", get(members::reservations::<S>))
    // Fines
    .route("/fines", post(fines::assess::<S>))
    .route("/fines/{id}", get(fines::get_one::<S>))
    .route("/fines/{id}/waive", post(fines::waive::<S>))
    .route("/fines/{id}/dispute", post(fines::dispute::<S>))
    .route("/fines/{id}/resolve", post(fines::resolve::<S>))
    // Reservations
    .route("/reservations", post(reservations::place::<S>))
    .route("/reservations/{id}", get(reservations::get_one::<S>))
    .route("/reservations/{id}/cancel", post(reservations::cancel::<S>))
    // Books and copies
    .route(
      "/books/{id}/copies",
      get(copies::list_for_book::<S>).post(copies::register::<S>),
    )
    .route("/books/{id}/reservations", get(reservations::list_for_book::<S>))
    .route("/copies/{id}", get(copies::get_one::<S>))
    .route("/copies/{id}/lost", post(copies::mark_lost::<S>))
    .route("/copies/{id}/repair", post(copies::mark_repair::<S>))
    .route("/copies/{id}/restore", post(copies::return_to_service::<S>))
    .route("/copies/{id}/retire", post(copies::retire::<S>))
    .with_state(desk)
}

#[cfg(test)]
mod tests;
