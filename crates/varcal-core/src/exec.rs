//! Script execution seams: the [`QuerySource`] capability and the
//! [`ScriptExecutor`] trait.
//!
//! A script is opaque parameterized SQL. The engine never interpolates
//! strings into script text; the application id and context fields are bound
//! as typed named parameters only.

use std::{collections::BTreeMap, future::Future, time::Duration};

use thiserror::Error;

use crate::{value::ScriptValue, variable::CalculationType};

// ─── Application context ─────────────────────────────────────────────────────

/// Read-only context supplied by the applications collaborator.
///
/// The application id is bound as the `:app` parameter; every extra field is
/// bound as `:name`.
#[derive(Debug, Clone, Default)]
pub struct ApplicationContext {
  pub application_id: String,
  pub fields:         BTreeMap<String, ScriptValue>,
}

impl ApplicationContext {
  pub fn new(application_id: impl Into<String>) -> Self {
    Self {
      application_id: application_id.into(),
      fields: BTreeMap::new(),
    }
  }

  pub fn with_field(mut self, name: impl Into<String>, value: ScriptValue) -> Self {
    self.fields.insert(name.into(), value);
    self
  }

  /// All named parameters bound for a script run.
  pub fn bind_params(&self) -> Vec<(String, ScriptValue)> {
    let mut params = vec![(
      ":app".to_owned(),
      ScriptValue::Text(self.application_id.clone()),
    )];
    for (name, value) in &self.fields {
      params.push((format!(":{name}"), value.clone()));
    }
    params
  }
}

// ─── Query source ────────────────────────────────────────────────────────────

/// One row of a query result: `(column name, value)` pairs in select order.
pub type Row = Vec<(String, ScriptValue)>;

/// An error reported by a backing data source.
#[derive(Debug, Error)]
pub enum SourceError {
  #[error("script syntax error: {0}")]
  Syntax(String),

  #[error("data source unavailable: {0}")]
  Unavailable(String),
}

/// Capability to run a parameterized query against one named data source.
///
/// Connection and credential management belong to the collaborator that
/// implements this trait. Implementations must cancel the underlying call
/// when the returned future is dropped.
pub trait QuerySource: Send + Sync {
  fn query<'a>(
    &'a self,
    script: &'a str,
    params: &'a [(String, ScriptValue)],
  ) -> impl Future<Output = Result<Vec<Row>, SourceError>> + Send + 'a;
}

// ─── Executor ────────────────────────────────────────────────────────────────

/// An error from one script execution attempt.
///
/// `Syntax` and `ScriptContract` are non-retryable — the script must be fixed
/// and published as a new version. `Timeout` and `SourceUnavailable` are
/// transient and retryable by the caller; the executor itself never retries.
#[derive(Debug, Error)]
pub enum ExecError {
  #[error("script syntax error: {0}")]
  Syntax(String),

  #[error("script execution exceeded the {0:?} deadline")]
  Timeout(Duration),

  #[error("data source unavailable: {0}")]
  SourceUnavailable(String),

  #[error("script contract violation: {0}")]
  ScriptContract(String),
}

impl From<SourceError> for ExecError {
  fn from(e: SourceError) -> Self {
    match e {
      SourceError::Syntax(msg) => Self::Syntax(msg),
      SourceError::Unavailable(msg) => Self::SourceUnavailable(msg),
    }
  }
}

/// Runs a resolved script against the source implied by its calculation type.
pub trait ScriptExecutor: Send + Sync {
  fn execute<'a>(
    &'a self,
    script: &'a str,
    calculation_type: CalculationType,
    ctx: &'a ApplicationContext,
  ) -> impl Future<Output = Result<ScriptValue, ExecError>> + Send + 'a;
}
