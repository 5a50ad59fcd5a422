//! Error type for `stacks-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column held something the domain types cannot represent.
  #[error("cannot decode {column} from {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("{0} does not fit in a database integer")]
  OutOfRange(&'static str),

  #[error("member not found: {0}")]
  MemberNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
