//! Script values — what a variable calculation produces.
//!
//! A script yields a single scalar, a single structured row, or no value at
//! all. The same compact JSON encoding is used for the result table and for
//! successful audit entries, so reconciliation tooling can compare them
//! directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Result;

/// The value computed by one script execution.
///
/// `Null` means the computation legitimately yielded no value (e.g. the
/// application has no matching rows). Multi-row results are a contract
/// violation and never reach this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptValue {
  Null,
  Bool(bool),
  Integer(i64),
  Float(f64),
  Text(String),
  /// A single structured row, keyed by column name.
  Row(BTreeMap<String, ScriptValue>),
}

impl ScriptValue {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  /// Compact JSON encoding shared by the result store and the audit log.
  pub fn to_json_text(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn from_json_text(text: &str) -> Result<Self> {
    Ok(serde_json::from_str(text)?)
  }
}

impl From<i64> for ScriptValue {
  fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<f64> for ScriptValue {
  fn from(v: f64) -> Self { Self::Float(v) }
}

impl From<bool> for ScriptValue {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<&str> for ScriptValue {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}
