//! The Stacks circulation core.
//!
//! Four components, leaves first:
//!
//! - [`FineLedger`]: fines and member balances;
//! - [`CopyRegistry`]: copy availability;
//! - [`ReservationQueue`]: holds per book, served strictly by priority;
//! - [`CirculationDesk`]: checkout, renewal and return, composing the other
//!   three.
//!
//! Components are generic over the store traits in [`stacks_core::store`]
//! and share one set of per-resource [`lock::Locks`].

pub mod desk;
pub mod journal;
pub mod ledger;
pub mod lock;
pub mod queue;
pub mod registry;

pub use desk::CirculationDesk;
pub use ledger::FineLedger;
pub use queue::ReservationQueue;
pub use registry::CopyRegistry;
