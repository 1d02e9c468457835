//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, script values as compact JSON (SQL NULL for a null value).

use chrono::{DateTime, Utc};
use uuid::Uuid;
use varcal_core::{
  record::{ExecutionOutcome, VariableExecution, VariableResult},
  value::ScriptValue,
  variable::{CalculationType, Variable},
  version::VariableVersion,
};

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp: {e}")))
}

// ─── CalculationType ─────────────────────────────────────────────────────────

pub fn encode_calculation_type(t: CalculationType) -> &'static str { t.as_str() }

pub fn decode_calculation_type(s: &str) -> Result<CalculationType> {
  match s {
    "live" => Ok(CalculationType::Live),
    "dwh" => Ok(CalculationType::Dwh),
    "hybrid" => Ok(CalculationType::Hybrid),
    other => Err(Error::Decode(format!("unknown calculation type: {other:?}"))),
  }
}

// ─── ScriptValue ─────────────────────────────────────────────────────────────

/// `Null` maps to SQL NULL; everything else to its compact JSON encoding.
pub fn encode_value(value: &ScriptValue) -> Result<Option<String>> {
  if value.is_null() {
    return Ok(None);
  }
  Ok(Some(value.to_json_text()?))
}

pub fn decode_value(column: Option<&str>) -> Result<ScriptValue> {
  match column {
    None => Ok(ScriptValue::Null),
    Some(text) => Ok(ScriptValue::from_json_text(text)?),
  }
}

/// The audit `result` column: value JSON on success, error text on failure.
pub fn encode_outcome(outcome: &ExecutionOutcome) -> Result<Option<String>> {
  match outcome {
    ExecutionOutcome::Success(value) => encode_value(value),
    ExecutionOutcome::Failure(message) => Ok(Some(message.clone())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `variables` row.
pub struct RawVariable {
  pub id:               String,
  pub name:             String,
  pub description:      Option<String>,
  pub calculation_type: String,
  pub is_active:        bool,
  pub created_by:       String,
  pub created_at:       String,
}

impl RawVariable {
  pub fn into_variable(self) -> Result<Variable> {
    Ok(Variable {
      variable_id:      decode_uuid(&self.id)?,
      name:             self.name,
      description:      self.description,
      calculation_type: decode_calculation_type(&self.calculation_type)?,
      is_active:        self.is_active,
      created_by:       self.created_by,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `variable_versions` row.
pub struct RawVersion {
  pub id:             String,
  pub variable_id:    String,
  pub version_number: i64,
  pub sql_script:     String,
  pub change_reason:  Option<String>,
  pub edited_by:      String,
  pub edited_at:      String,
}

impl RawVersion {
  pub fn into_version(self) -> Result<VariableVersion> {
    let number = u32::try_from(self.version_number)
      .map_err(|_| Error::Decode(format!("bad version number: {}", self.version_number)))?;
    Ok(VariableVersion {
      version_id:     decode_uuid(&self.id)?,
      variable_id:    decode_uuid(&self.variable_id)?,
      version_number: number,
      sql_script:     self.sql_script,
      change_reason:  self.change_reason,
      edited_by:      self.edited_by,
      edited_at:      decode_dt(&self.edited_at)?,
    })
  }
}

/// Raw strings read directly from a `variable_results` row.
pub struct RawResult {
  pub id:             String,
  pub application_id: String,
  pub variable_id:    String,
  pub value:          Option<String>,
  pub calculated_by:  String,
  pub calculated_at:  String,
}

impl RawResult {
  pub fn into_result(self) -> Result<VariableResult> {
    Ok(VariableResult {
      result_id:      decode_uuid(&self.id)?,
      application_id: self.application_id,
      variable_id:    decode_uuid(&self.variable_id)?,
      value:          decode_value(self.value.as_deref())?,
      calculated_by:  self.calculated_by,
      calculated_at:  decode_dt(&self.calculated_at)?,
    })
  }
}

/// Raw strings read directly from a `variable_executions` row.
pub struct RawExecution {
  pub id:             String,
  pub application_id: String,
  pub variable_id:    Option<String>,
  pub executed_by:    String,
  pub result:         Option<String>,
  pub executed_at:    String,
}

impl RawExecution {
  pub fn into_execution(self) -> Result<VariableExecution> {
    let variable_id = self
      .variable_id
      .as_deref()
      .map(decode_uuid)
      .transpose()?;
    Ok(VariableExecution {
      execution_id:   decode_uuid(&self.id)?,
      application_id: self.application_id,
      variable_id,
      executed_by:    self.executed_by,
      result:         self.result,
      executed_at:    decode_dt(&self.executed_at)?,
    })
  }
}
