//! [`Engine`] — the calculation coordinator.
//!
//! One calculation request walks Resolving → Executing → Recording → Done,
//! or drops to Failed from any state. Every failure in Resolving or
//! Executing still appends a failure audit entry before the error surfaces,
//! so the audit log is a complete history of attempts.

use std::sync::Arc;

use uuid::Uuid;
use varcal_core::{
  exec::{ApplicationContext, ScriptExecutor},
  record::{ExecutionOutcome, NewExecution, NewResult, VariableExecution, VariableResult},
  store::VariableStore,
  value::ScriptValue,
  variable::{NewVariable, Variable, VariableRef},
  version::{NewVersion, VariableVersion},
};

use crate::error::CalcError;

// ─── Request and outcome ─────────────────────────────────────────────────────

/// One calculation request: which variable, for which application, by whom.
#[derive(Debug, Clone)]
pub struct CalculationRequest {
  pub variable:       VariableRef,
  /// Pin an older version; `None` executes the current version.
  pub pinned_version: Option<u32>,
  pub executed_by:    String,
  pub context:        ApplicationContext,
}

impl CalculationRequest {
  pub fn new(
    variable: impl Into<VariableRef>,
    executed_by: impl Into<String>,
    context: ApplicationContext,
  ) -> Self {
    Self {
      variable: variable.into(),
      pinned_version: None,
      executed_by: executed_by.into(),
      context,
    }
  }

  pub fn pinned(mut self, version_number: u32) -> Self {
    self.pinned_version = Some(version_number);
    self
  }
}

/// A completed calculation: the computed value plus the rows it produced.
#[derive(Debug, Clone)]
pub struct Calculation {
  pub value:     ScriptValue,
  /// The upserted current-state row.
  pub result:    VariableResult,
  /// The success audit entry.
  pub execution: VariableExecution,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Coordinates variable resolution, script execution, result upsert, and the
/// execution audit. Stateless; cheap to share.
pub struct Engine<S, E> {
  store:    Arc<S>,
  executor: E,
}

impl<S, E> Engine<S, E>
where
  S: VariableStore,
  E: ScriptExecutor,
{
  pub fn new(store: Arc<S>, executor: E) -> Self {
    Self { store, executor }
  }

  // ── Calculation ───────────────────────────────────────────────────────────

  /// Calculate one variable for one application.
  ///
  /// Appends exactly one audit entry per attempt, success or failure. The
  /// result row is upserted before the success audit entry is appended; an
  /// audit append failure is fatal even then.
  pub async fn calculate(&self, request: CalculationRequest) -> Result<Calculation, CalcError> {
    let application_id = request.context.application_id.clone();
    let executed_by = request.executed_by.clone();

    // Resolving: variable must exist and be active, version must exist.
    let variable = match self.resolve_variable(&request.variable).await {
      Ok(v) => v,
      Err(err) => return self.fail(&application_id, None, &executed_by, err).await,
    };
    if !variable.is_active {
      let err = varcal_core::Error::InactiveVariable(variable.variable_id).into();
      return self
        .fail(&application_id, Some(variable.variable_id), &executed_by, err)
        .await;
    }
    let version = match self.resolve_version(&variable, request.pinned_version).await {
      Ok(v) => v,
      Err(err) => {
        return self
          .fail(&application_id, Some(variable.variable_id), &executed_by, err)
          .await;
      }
    };

    // Executing.
    tracing::debug!(
      variable = %variable.name,
      version = version.version_number,
      application = %application_id,
      "executing script"
    );
    let value = match self
      .executor
      .execute(&version.sql_script, variable.calculation_type, &request.context)
      .await
    {
      Ok(v) => v,
      Err(e) => {
        return self
          .fail(
            &application_id,
            Some(variable.variable_id),
            &executed_by,
            CalcError::Exec(e),
          )
          .await;
      }
    };

    // Recording: result upsert first, then the success audit entry.
    let result = match self
      .store
      .upsert_result(NewResult {
        application_id: application_id.clone(),
        variable_id:    variable.variable_id,
        value:          value.clone(),
        calculated_by:  executed_by.clone(),
      })
      .await
    {
      Ok(r) => r,
      Err(e) => {
        return self
          .fail(
            &application_id,
            Some(variable.variable_id),
            &executed_by,
            CalcError::Store(Box::new(e)),
          )
          .await;
      }
    };

    let execution = self
      .store
      .append_execution(NewExecution {
        application_id: application_id.clone(),
        variable_id:    Some(variable.variable_id),
        executed_by:    executed_by.clone(),
        outcome:        ExecutionOutcome::Success(value.clone()),
      })
      .await
      .map_err(|e| CalcError::AuditWrite(Box::new(e)))?;

    tracing::info!(
      variable = %variable.name,
      application = %application_id,
      "calculation complete"
    );
    Ok(Calculation {
      value,
      result,
      execution,
    })
  }

  // ── Variable publishing ───────────────────────────────────────────────────

  /// Register a variable together with version 1 of its script.
  pub async fn publish_variable(
    &self,
    input: NewVariable,
    sql_script: impl Into<String>,
  ) -> Result<(Variable, VariableVersion), CalcError> {
    let edited_by = input.created_by.clone();
    let variable = self
      .store
      .register_variable(input)
      .await
      .map_err(box_store)?;
    let version = self
      .store
      .add_version(
        NewVersion::new(variable.variable_id, sql_script, edited_by)
          .with_reason("Initial version"),
      )
      .await
      .map_err(box_store)?;
    Ok((variable, version))
  }

  // ── Registry passthroughs ─────────────────────────────────────────────────

  pub async fn register_variable(&self, input: NewVariable) -> Result<Variable, CalcError> {
    self.store.register_variable(input).await.map_err(box_store)
  }

  pub async fn set_active(&self, id: Uuid, active: bool) -> Result<Variable, CalcError> {
    self
      .store
      .set_active(id, active)
      .await
      .map_err(box_store)?
      .ok_or_else(|| varcal_core::Error::VariableNotFound(VariableRef::Id(id)).into())
  }

  pub async fn delete_variable(&self, id: Uuid) -> Result<(), CalcError> {
    let deleted = self.store.delete_variable(id).await.map_err(box_store)?;
    if !deleted {
      return Err(varcal_core::Error::VariableNotFound(VariableRef::Id(id)).into());
    }
    Ok(())
  }

  pub async fn list_variables(&self, active_only: bool) -> Result<Vec<Variable>, CalcError> {
    self
      .store
      .list_variables(active_only)
      .await
      .map_err(box_store)
  }

  /// Read-only lookups work for inactive variables.
  pub async fn get_variable(&self, reference: &VariableRef) -> Result<Variable, CalcError> {
    self.resolve_variable(reference).await
  }

  /// The current result for the pair; historical reads are allowed even for
  /// inactive variables.
  pub async fn get_result(
    &self,
    application_id: &str,
    variable_id: Uuid,
  ) -> Result<VariableResult, CalcError> {
    self
      .store
      .get_result(application_id, variable_id)
      .await
      .map_err(box_store)?
      .ok_or_else(|| {
        varcal_core::Error::ResultNotFound {
          application_id: application_id.to_owned(),
          variable_id,
        }
        .into()
      })
  }

  pub async fn results_for_application(
    &self,
    application_id: &str,
  ) -> Result<Vec<VariableResult>, CalcError> {
    self
      .store
      .results_for_application(application_id)
      .await
      .map_err(box_store)
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn resolve_variable(&self, reference: &VariableRef) -> Result<Variable, CalcError> {
    let found = match reference {
      VariableRef::Id(id) => self.store.get_variable(*id).await,
      VariableRef::Name(name) => self.store.find_variable(name).await,
    }
    .map_err(box_store)?;

    found.ok_or_else(|| varcal_core::Error::VariableNotFound(reference.clone()).into())
  }

  async fn resolve_version(
    &self,
    variable: &Variable,
    pinned: Option<u32>,
  ) -> Result<VariableVersion, CalcError> {
    match pinned {
      Some(number) => self
        .store
        .get_version(variable.variable_id, number)
        .await
        .map_err(box_store)?
        .ok_or_else(|| {
          varcal_core::Error::VersionNotFound {
            variable_id: variable.variable_id,
            number,
          }
          .into()
        }),
      None => self
        .store
        .current_version(variable.variable_id)
        .await
        .map_err(box_store)?
        .ok_or_else(|| varcal_core::Error::NoVersions(variable.variable_id).into()),
    }
  }

  /// Record a failed attempt in the audit log, then surface the error.
  ///
  /// If the audit append itself fails, the append error wins and the
  /// original failure is emitted to the log instead.
  async fn fail(
    &self,
    application_id: &str,
    variable_id: Option<Uuid>,
    executed_by: &str,
    err: CalcError,
  ) -> Result<Calculation, CalcError> {
    tracing::warn!(%err, application = application_id, "calculation failed");

    let appended = self
      .store
      .append_execution(NewExecution {
        application_id: application_id.to_owned(),
        variable_id,
        executed_by: executed_by.to_owned(),
        outcome: ExecutionOutcome::Failure(err.to_string()),
      })
      .await;

    match appended {
      Ok(_) => Err(err),
      Err(audit_err) => {
        tracing::error!(%err, "audit append failed after calculation failure");
        Err(CalcError::AuditWrite(Box::new(audit_err)))
      }
    }
  }
}

fn box_store<E>(e: E) -> CalcError
where
  E: std::error::Error + Send + Sync + 'static,
{
  CalcError::Store(Box::new(e))
}
