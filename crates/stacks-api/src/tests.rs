//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use stacks_circulation::CirculationDesk;
use stacks_core::{clock::FixedClock, policy::CirculationPolicy};
use stacks_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use crate::api_router;

struct App {
  router: Router,
  clock:  Arc<FixedClock>,
}

async fn app() -> App {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let clock = Arc::new(FixedClock::new(
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
  ));
  let desk = Arc::new(CirculationDesk::over(
    store,
    clock.clone(),
    CirculationPolicy::default(),
  ));
  App { router: api_router(desk), clock }
}

impl App {
  async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = self.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn member(&self, name: &str) -> String {
    let (status, body) = self
      .send("POST", "/members", Some(json!({ "name": name })))
      .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["member_id"].as_str().unwrap().to_owned()
  }

  async fn copy(&self, book: &str) -> String {
    let (status, body) = self
      .send(
        "POST",
        &format!("/books/{book}/copies"),
        Some(json!({ "condition": "good", "location": "A1" })),
      )
      .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["copy_id"].as_str().unwrap().to_owned()
  }

  async fn checkout(&self, book: &str, member: &str) -> (StatusCode, Value) {
    self
      .send("POST", "/loans", Some(json!({ "book_id": book, "member_id": member })))
      .await
  }
}

fn new_book() -> String { stacks_core::id::BookId::new().to_string() }

// ─── Loans ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn late_return_then_payment() {
  let app = app().await;
  let ada = app.member("Ada").await;
  let book = new_book();
  let copy = app.copy(&book).await;

  let (status, loan) = app.checkout(&book, &ada).await;
  assert_eq!(status, StatusCode::CREATED, "{loan}");
  assert_eq!(loan["status"], "ACTIVE");
  assert_eq!(loan["copy_id"], copy.as_str());
  assert_eq!(loan["due_date"], "2024-03-15");
  let loan_id = loan["loan_id"].as_str().unwrap().to_owned();

  app.clock.advance_days(17);
  let (status, receipt) = app
    .send("POST", &format!("/loans/{loan_id}/return"), None)
    .await;
  assert_eq!(status, StatusCode::OK, "{receipt}");
  assert_eq!(receipt["days_overdue"], 3);
  assert_eq!(receipt["fine_charged"], "0.75");

  let (_, balance) = app
    .send("GET", &format!("/members/{ada}/balance"), None)
    .await;
  assert_eq!(balance["balance"], "0.75");
  assert_eq!(balance["outstanding"], true);

  let (status, paid) = app
    .send(
      "POST",
      &format!("/members/{ada}/payments"),
      Some(json!({ "amount": "0.75" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK, "{paid}");
  assert_eq!(paid["outstanding"], false);

  let (_, fines) = app.send("GET", &format!("/members/{ada}/fines"), None).await;
  assert_eq!(fines[0]["status"], "PAID");
}

#[tokio::test]
async fn overdue_loans_report_their_observed_status() {
  let app = app().await;
  let ada = app.member("Ada").await;
  let book = new_book();
  app.copy(&book).await;
  app.checkout(&book, &ada).await;

  app.clock.advance_days(15);
  let (status, overdue) = app.send("GET", "/loans/overdue", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(overdue.as_array().unwrap().len(), 1);
  assert_eq!(overdue[0]["status"], "ACTIVE");
  assert_eq!(overdue[0]["observed_status"], "OVERDUE");

  let (status, swept) = app.send("POST", "/loans/overdue", None).await;
  assert_eq!(status, StatusCode::OK, "{swept}");
  assert_eq!(swept[0]["reason"], "OVERDUE");
  assert_eq!(swept[0]["amount"], "0.25");
  let (_, balance) = app
    .send("GET", &format!("/members/{ada}/balance"), None)
    .await;
  assert_eq!(balance["balance"], "0.25");
}

// ─── Error mapping ───────────────────────────────────────────────────────────

#[tokio::test]
async fn business_rules_map_to_422() {
  let app = app().await;
  let ada = app.member("Ada").await;
  let book = new_book();
  app.copy(&book).await;

  let (status, _) = app
    .send(
      "POST",
      "/fines",
      Some(json!({ "member_id": ada, "reason": "ADMINISTRATIVE", "amount": "1.00" })),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, body) = app.checkout(&book, &ada).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "outstanding fines");

  let bob = app.member("Bob").await;
  let (status, body) = app.checkout(&new_book(), &bob).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "No available copies");

  let shelved = new_book();
  let copy = app.copy(&shelved).await;
  let (status, body) = app
    .send(
      "POST",
      "/loans",
      Some(json!({ "book_id": shelved, "member_id": bob, "loan_period_days": u32::MAX })),
    )
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "loan period must be between 1 and 365 days");
  let (_, body) = app.send("GET", &format!("/copies/{copy}"), None).await;
  assert_eq!(body["status"], "AVAILABLE");
}

#[tokio::test]
async fn unknown_records_map_to_404() {
  let app = app().await;
  let id = stacks_core::id::LoanId::new();
  let (status, body) = app.send("GET", &format!("/loans/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("loan"));

  let member = stacks_core::id::MemberId::new();
  let (status, _) = app.send("GET", &format!("/members/{member}/balance"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn double_return_maps_to_409() {
  let app = app().await;
  let ada = app.member("Ada").await;
  let book = new_book();
  app.copy(&book).await;
  let (_, loan) = app.checkout(&book, &ada).await;
  let loan_id = loan["loan_id"].as_str().unwrap();

  let (status, _) = app.send("POST", &format!("/loans/{loan_id}/return"), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = app.send("POST", &format!("/loans/{loan_id}/return"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn blank_member_name_is_a_bad_request() {
  let app = app().await;
  let (status, _) = app
    .send("POST", "/members", Some(json!({ "name": "  " })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Reservations ────────────────────────────────────────────────────────────

#[tokio::test]
async fn returned_copy_is_held_for_the_first_reservation() {
  let app = app().await;
  let ada = app.member("Ada").await;
  let bob = app.member("Bob").await;
  let book = new_book();
  let copy = app.copy(&book).await;

  let (_, loan) = app.checkout(&book, &ada).await;
  let loan_id = loan["loan_id"].as_str().unwrap().to_owned();

  let (status, reservation) = app
    .send(
      "POST",
      "/reservations",
      Some(json!({ "member_id": bob, "book_id": book })),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED);
  let reservation_id = reservation["reservation_id"].as_str().unwrap().to_owned();

  let (status, _) = app
    .send(
      "POST",
      "/reservations",
      Some(json!({ "member_id": bob, "book_id": book })),
    )
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let (_, receipt) = app.send("POST", &format!("/loans/{loan_id}/return"), None).await;
  assert_eq!(receipt["held_for"], reservation_id.as_str());

  let (_, held) = app.send("GET", &format!("/copies/{copy}"), None).await;
  assert_eq!(held["status"], "RESERVED");
  let (_, queue) = app
    .send("GET", &format!("/books/{book}/reservations"), None)
    .await;
  assert_eq!(queue[0]["status"], "READY_FOR_PICKUP");

  let (status, loan) = app.checkout(&book, &bob).await;
  assert_eq!(status, StatusCode::CREATED, "{loan}");
  assert_eq!(loan["copy_id"], copy.as_str());
}
