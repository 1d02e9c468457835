//! Variable versions — immutable snapshots of a variable's SQL script.
//!
//! Versions are strictly append-only. A script is never corrected in place;
//! corrections create a new version with the next number. The "current"
//! version is the one with the highest number, unless a caller pins an older
//! one for a calculation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One immutable revision of a variable's SQL script.
/// `(variable_id, version_number)` is unique; numbers start at 1 and are
/// never reused or decremented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableVersion {
  pub version_id:     Uuid,
  pub variable_id:    Uuid,
  pub version_number: u32,
  /// Opaque parameterized query text. The application id is bound as the
  /// `:app` parameter at execution time.
  pub sql_script:     String,
  pub change_reason:  Option<String>,
  pub edited_by:      String,
  /// Store-assigned; never changes after creation.
  pub edited_at:      DateTime<Utc>,
}

/// Input to [`crate::store::VariableStore::add_version`].
/// The version number is computed by the store, atomically with the insert.
#[derive(Debug, Clone)]
pub struct NewVersion {
  pub variable_id:   Uuid,
  pub sql_script:    String,
  pub change_reason: Option<String>,
  pub edited_by:     String,
}

impl NewVersion {
  /// Convenience constructor with no change reason.
  pub fn new(
    variable_id: Uuid,
    sql_script: impl Into<String>,
    edited_by: impl Into<String>,
  ) -> Self {
    Self {
      variable_id,
      sql_script: sql_script.into(),
      change_reason: None,
      edited_by: edited_by.into(),
    }
  }

  pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
    self.change_reason = Some(reason.into());
    self
  }
}
