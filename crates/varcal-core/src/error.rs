//! Error types for `varcal-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::variable::VariableRef;

#[derive(Debug, Error)]
pub enum Error {
  #[error("variable name already registered: {0:?}")]
  DuplicateName(String),

  #[error("variable not found: {0}")]
  VariableNotFound(VariableRef),

  #[error("version {number} not found for variable {variable_id}")]
  VersionNotFound { variable_id: Uuid, number: u32 },

  #[error("variable {0} is inactive")]
  InactiveVariable(Uuid),

  #[error("variable {0} has no versions")]
  NoVersions(Uuid),

  #[error("no result for application {application_id:?} and variable {variable_id}")]
  ResultNotFound {
    application_id: String,
    variable_id:    Uuid,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
