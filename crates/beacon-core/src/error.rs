//! Error types for `beacon-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid session id: {0}")]
  InvalidKey(String),

  #[error("invalid alert record: {0}")]
  InvalidRecord(String),

  #[error("alert store is closed")]
  Closed,
}

impl Error {
  /// `true` for errors caused by malformed caller input.
  pub fn is_validation(&self) -> bool {
    matches!(self, Self::InvalidKey(_) | Self::InvalidRecord(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
