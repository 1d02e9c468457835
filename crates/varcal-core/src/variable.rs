//! Variable — a named, versioned computed metric definition.
//!
//! A variable holds identity and metadata only. Its SQL lives in immutable
//! versions; its computed values live in the result and audit tables.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The backing data-source strategy a variable's script executes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationType {
  /// Online transactional source; minimal-latency single-application lookups.
  Live,
  /// Analytical warehouse source; aggregate historical computation.
  Dwh,
  /// Both source bindings available within one script's parameter context.
  /// The combination rule is script-defined; the engine never merges.
  Hybrid,
}

impl CalculationType {
  /// The discriminant string stored in the `calculation_type` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Live => "live",
      Self::Dwh => "dwh",
      Self::Hybrid => "hybrid",
    }
  }
}

/// A registered variable. Mutated only to toggle activity or edit metadata;
/// an inactive variable is never selected for new calculations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
  pub variable_id:      Uuid,
  /// Globally unique.
  pub name:             String,
  pub description:      Option<String>,
  pub calculation_type: CalculationType,
  pub is_active:        bool,
  pub created_by:       String,
  /// Store-assigned; never changes after creation.
  pub created_at:       DateTime<Utc>,
}

/// Input to [`crate::store::VariableStore::register_variable`].
/// `variable_id` and `created_at` are always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewVariable {
  pub name:             String,
  pub description:      Option<String>,
  pub calculation_type: CalculationType,
  pub created_by:       String,
}

impl NewVariable {
  /// Convenience constructor with no description.
  pub fn new(
    name: impl Into<String>,
    calculation_type: CalculationType,
    created_by: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      description: None,
      calculation_type,
      created_by: created_by.into(),
    }
  }
}

/// How a caller identifies a variable: by surrogate id or by unique name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableRef {
  Id(Uuid),
  Name(String),
}

impl fmt::Display for VariableRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Id(id) => write!(f, "{id}"),
      Self::Name(name) => write!(f, "{name:?}"),
    }
  }
}

impl From<Uuid> for VariableRef {
  fn from(id: Uuid) -> Self { Self::Id(id) }
}

impl From<&str> for VariableRef {
  fn from(name: &str) -> Self { Self::Name(name.to_owned()) }
}
