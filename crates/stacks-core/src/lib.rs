//! Core types and trait definitions for the Stacks circulation system.
//!
//! This crate is deliberately free of HTTP, database and runtime
//! dependencies. It defines the records the circulation core reads and
//! writes, the error taxonomy, and the store traits that persistence
//! backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod clock;
pub mod copy;
pub mod error;
pub mod fine;
pub mod id;
pub mod loan;
pub mod policy;
pub mod reservation;
pub mod store;

pub use error::{BusinessRule, Entity, Error, Result};
