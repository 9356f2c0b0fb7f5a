//! Error types for `toolcrib-client`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("{method} {url} → {status}: {message}")]
  Api {
    method:  String,
    url:     String,
    status:  u16,
    message: String,
  },

  #[error("server reported data status {got:?}, expected {expected:?}")]
  UnexpectedDataStatus {
    expected: &'static str,
    got:      Option<String>,
  },

  #[error("response payload is not {0}")]
  UnexpectedPayload(&'static str),

  #[error("entity has no id")]
  MissingId,

  #[error("collection has no id list; add/remove is not supported")]
  UnsupportedRelation,

  #[error("batch task failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  #[error(transparent)]
  Core(#[from] toolcrib_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
