//! Error type for `varcal-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] varcal_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column could not be decoded back into its domain type.
  #[error("decode error: {0}")]
  Decode(String),

  /// Version numbering kept colliding after the bounded retry loop.
  #[error("version number conflict for variable {variable_id} after {attempts} attempts")]
  VersionConflict { variable_id: Uuid, attempts: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
