//! Error types for `toolcrib-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("record is missing required field {0:?}")]
  MissingField(&'static str),

  #[error("invalid date value {0:?}")]
  InvalidDate(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
