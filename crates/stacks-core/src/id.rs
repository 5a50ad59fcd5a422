//! Opaque identifiers.
//!
//! Every entity is referenced by a UUID newtype so that a loan id can never be
//! passed where a copy id is expected. On the wire and in the database they
//! are plain hyphenated UUID strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub Uuid);

    impl $name {
      /// Generate a fresh random id.
      pub fn new() -> Self { Self(Uuid::new_v4()) }
    }

    impl Default for $name {
      fn default() -> Self { Self::new() }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }

    impl From<Uuid> for $name {
      fn from(id: Uuid) -> Self { Self(id) }
    }

    impl From<$name> for Uuid {
      fn from(id: $name) -> Self { id.0 }
    }
  };
}

id_type!(
  /// A title in the catalogue. Copies and reservations point at it.
  BookId
);
id_type!(
  /// One physical copy of a book.
  CopyId
);
id_type!(MemberId);
id_type!(LoanId);
id_type!(FineId);
id_type!(ReservationId);
