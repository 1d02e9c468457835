//! Result and execution records.
//!
//! `VariableResult` is a materialized "current state" cache: at most one row
//! per (application, variable), overwritten on recalculation. History lives
//! only in `VariableExecution`, which is append-only and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::ScriptValue;

// ─── Results ─────────────────────────────────────────────────────────────────

/// The latest known computed value for one (application, variable) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableResult {
  /// Stable across overwrites; assigned on first calculation.
  pub result_id:      Uuid,
  pub application_id: String,
  pub variable_id:    Uuid,
  pub value:          ScriptValue,
  pub calculated_by:  String,
  pub calculated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::VariableStore::upsert_result`].
#[derive(Debug, Clone)]
pub struct NewResult {
  pub application_id: String,
  pub variable_id:    Uuid,
  pub value:          ScriptValue,
  pub calculated_by:  String,
}

// ─── Executions ──────────────────────────────────────────────────────────────

/// The outcome of one calculation attempt, as written to the audit log.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
  /// Stored as the same JSON encoding as the result table.
  Success(ScriptValue),
  /// Stored as the error's display string.
  Failure(String),
}

impl ExecutionOutcome {
  pub fn is_success(&self) -> bool { matches!(self, Self::Success(_)) }
}

/// One append-only audit row. Rows accumulate per attempt — there is no
/// uniqueness constraint — and outlive the variable they describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableExecution {
  pub execution_id:   Uuid,
  pub application_id: String,
  /// `None` once the variable has been deleted, or when the attempt failed
  /// before the variable could be resolved.
  pub variable_id:    Option<Uuid>,
  pub executed_by:    String,
  /// Outcome text: the value's JSON encoding on success (`None` for a null
  /// value), an error description on failure.
  pub result:         Option<String>,
  pub executed_at:    DateTime<Utc>,
}

/// Input to [`crate::store::VariableStore::append_execution`].
#[derive(Debug, Clone)]
pub struct NewExecution {
  pub application_id: String,
  pub variable_id:    Option<Uuid>,
  pub executed_by:    String,
  pub outcome:        ExecutionOutcome,
}
