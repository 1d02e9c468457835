//! [`SqliteStore`] — the SQLite implementation of [`VariableStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;
use varcal_core::{
  record::{NewExecution, NewResult, VariableExecution, VariableResult},
  store::VariableStore,
  variable::{NewVariable, Variable, VariableRef},
  version::{NewVersion, VariableVersion},
};

use crate::{
  encode::{
    RawExecution, RawResult, RawVariable, RawVersion, encode_calculation_type,
    encode_dt, encode_outcome, encode_uuid, encode_value,
  },
  schema::SCHEMA,
  Error, Result,
};

/// How many times `add_version` re-runs its read-max-then-insert transaction
/// after a version-number collision before giving up.
const VERSION_RETRY_ATTEMPTS: u32 = 3;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Varcal variable store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }
}

// ─── VariableStore impl ──────────────────────────────────────────────────────

impl VariableStore for SqliteStore {
  type Error = Error;

  // ── Registry ──────────────────────────────────────────────────────────────

  async fn register_variable(&self, input: NewVariable) -> Result<Variable> {
    let variable = Variable {
      variable_id:      Uuid::new_v4(),
      name:             input.name,
      description:      input.description,
      calculation_type: input.calculation_type,
      is_active:        true,
      created_by:       input.created_by,
      created_at:       Utc::now(),
    };

    let id_str   = encode_uuid(variable.variable_id);
    let name     = variable.name.clone();
    let desc     = variable.description.clone();
    let type_str = encode_calculation_type(variable.calculation_type).to_owned();
    let by       = variable.created_by.clone();
    let at_str   = encode_dt(variable.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO variables
             (id, name, description, calculation_type, is_active, created_by, created_at)
           VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
          rusqlite::params![id_str, name, desc, type_str, by, at_str],
        )?;
        Ok(())
      })
      .await;

    match inserted {
      Ok(()) => Ok(variable),
      Err(e) if db_unique_violation(&e, "variables.name") => {
        Err(varcal_core::Error::DuplicateName(variable.name).into())
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn get_variable(&self, id: Uuid) -> Result<Option<Variable>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawVariable> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, name, description, calculation_type, is_active, created_by, created_at
               FROM variables WHERE id = ?1",
              rusqlite::params![id_str],
              variable_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVariable::into_variable).transpose()
  }

  async fn find_variable(&self, name: &str) -> Result<Option<Variable>> {
    let name = name.to_owned();

    let raw: Option<RawVariable> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, name, description, calculation_type, is_active, created_by, created_at
               FROM variables WHERE name = ?1",
              rusqlite::params![name],
              variable_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVariable::into_variable).transpose()
  }

  async fn list_variables(&self, active_only: bool) -> Result<Vec<Variable>> {
    let raws: Vec<RawVariable> = self
      .conn
      .call(move |conn| {
        let sql = if active_only {
          "SELECT id, name, description, calculation_type, is_active, created_by, created_at
           FROM variables WHERE is_active = 1 ORDER BY name"
        } else {
          "SELECT id, name, description, calculation_type, is_active, created_by, created_at
           FROM variables ORDER BY name"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map([], variable_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVariable::into_variable).collect()
  }

  async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Variable>> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE variables SET is_active = ?2 WHERE id = ?1",
          rusqlite::params![id_str, active],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_variable(id).await
  }

  async fn delete_variable(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM variables WHERE id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Versions — append-only writes ─────────────────────────────────────────

  async fn add_version(&self, input: NewVersion) -> Result<VariableVersion> {
    // Read-max-then-insert inside one transaction; the UNIQUE constraint on
    // (variable_id, version_number) is the arbiter under concurrency, and a
    // collision re-runs the whole transaction. The first version is not
    // special-cased: COALESCE makes it max(∅) + 1 = 1.
    for attempt in 1..=VERSION_RETRY_ATTEMPTS {
      let version_id = Uuid::new_v4();
      let edited_at  = Utc::now();

      let id_str     = encode_uuid(version_id);
      let var_id_str = encode_uuid(input.variable_id);
      let script     = input.sql_script.clone();
      let reason     = input.change_reason.clone();
      let by         = input.edited_by.clone();
      let at_str     = encode_dt(edited_at);

      let outcome = self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;

          let exists: bool = tx
            .query_row(
              "SELECT 1 FROM variables WHERE id = ?1",
              rusqlite::params![var_id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if !exists {
            return Ok(VersionInsert::MissingVariable);
          }

          let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(version_number), 0) + 1
             FROM variable_versions WHERE variable_id = ?1",
            rusqlite::params![var_id_str],
            |row| row.get(0),
          )?;

          let inserted = tx.execute(
            "INSERT INTO variable_versions
               (id, variable_id, version_number, sql_script, change_reason, edited_by, edited_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![id_str, var_id_str, next, script, reason, by, at_str],
          );

          match inserted {
            Ok(_) => {
              tx.commit()?;
              Ok(VersionInsert::Inserted(next))
            }
            Err(e) if unique_violation(&e, "variable_versions") => {
              Ok(VersionInsert::Conflict)
            }
            Err(e) => Err(e.into()),
          }
        })
        .await?;

      match outcome {
        VersionInsert::Inserted(next) => {
          let number = u32::try_from(next)
            .map_err(|_| Error::Decode(format!("bad version number: {next}")))?;
          return Ok(VariableVersion {
            version_id,
            variable_id: input.variable_id,
            version_number: number,
            sql_script: input.sql_script,
            change_reason: input.change_reason,
            edited_by: input.edited_by,
            edited_at,
          });
        }
        VersionInsert::MissingVariable => {
          return Err(
            varcal_core::Error::VariableNotFound(VariableRef::Id(input.variable_id)).into(),
          );
        }
        VersionInsert::Conflict => {
          tracing::debug!(
            variable = %input.variable_id,
            attempt,
            "version number collision, retrying"
          );
        }
      }
    }

    Err(Error::VersionConflict {
      variable_id: input.variable_id,
      attempts:    VERSION_RETRY_ATTEMPTS,
    })
  }

  async fn current_version(&self, variable_id: Uuid) -> Result<Option<VariableVersion>> {
    let var_id_str = encode_uuid(variable_id);

    let raw: Option<RawVersion> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, variable_id, version_number, sql_script, change_reason, edited_by, edited_at
               FROM variable_versions WHERE variable_id = ?1
               ORDER BY version_number DESC LIMIT 1",
              rusqlite::params![var_id_str],
              version_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVersion::into_version).transpose()
  }

  async fn get_version(&self, variable_id: Uuid, number: u32) -> Result<Option<VariableVersion>> {
    let var_id_str = encode_uuid(variable_id);
    let number_val = i64::from(number);

    let raw: Option<RawVersion> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, variable_id, version_number, sql_script, change_reason, edited_by, edited_at
               FROM variable_versions WHERE variable_id = ?1 AND version_number = ?2",
              rusqlite::params![var_id_str, number_val],
              version_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVersion::into_version).transpose()
  }

  async fn list_versions(&self, variable_id: Uuid) -> Result<Vec<VariableVersion>> {
    let var_id_str = encode_uuid(variable_id);

    let raws: Vec<RawVersion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, variable_id, version_number, sql_script, change_reason, edited_by, edited_at
           FROM variable_versions WHERE variable_id = ?1
           ORDER BY version_number",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![var_id_str], version_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVersion::into_version).collect()
  }

  // ── Results ───────────────────────────────────────────────────────────────

  async fn upsert_result(&self, input: NewResult) -> Result<VariableResult> {
    let row_id = Uuid::new_v4(); // only used when the pair has no row yet

    let id_str     = encode_uuid(row_id);
    let app_id     = input.application_id.clone();
    let var_id_str = encode_uuid(input.variable_id);
    let value_str  = encode_value(&input.value)?;
    let by         = input.calculated_by.clone();
    let at_str     = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO variable_results
             (id, application_id, variable_id, value, calculated_by, calculated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (application_id, variable_id) DO UPDATE SET
             value         = excluded.value,
             calculated_by = excluded.calculated_by,
             calculated_at = excluded.calculated_at",
          rusqlite::params![id_str, app_id, var_id_str, value_str, by, at_str],
        )?;
        Ok(())
      })
      .await?;

    // Read back the surviving row; its id is stable across overwrites.
    self
      .get_result(&input.application_id, input.variable_id)
      .await?
      .ok_or(Error::Core(varcal_core::Error::ResultNotFound {
        application_id: input.application_id,
        variable_id:    input.variable_id,
      }))
  }

  async fn get_result(
    &self,
    application_id: &str,
    variable_id: Uuid,
  ) -> Result<Option<VariableResult>> {
    let app_id     = application_id.to_owned();
    let var_id_str = encode_uuid(variable_id);

    let raw: Option<RawResult> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, application_id, variable_id, value, calculated_by, calculated_at
               FROM variable_results WHERE application_id = ?1 AND variable_id = ?2",
              rusqlite::params![app_id, var_id_str],
              result_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawResult::into_result).transpose()
  }

  async fn results_for_application(&self, application_id: &str) -> Result<Vec<VariableResult>> {
    let app_id = application_id.to_owned();

    let raws: Vec<RawResult> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, application_id, variable_id, value, calculated_by, calculated_at
           FROM variable_results WHERE application_id = ?1
           ORDER BY calculated_at, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![app_id], result_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawResult::into_result).collect()
  }

  // ── Audit log — append-only ───────────────────────────────────────────────

  async fn append_execution(&self, input: NewExecution) -> Result<VariableExecution> {
    let execution = VariableExecution {
      execution_id:   Uuid::new_v4(),
      application_id: input.application_id,
      variable_id:    input.variable_id,
      executed_by:    input.executed_by,
      result:         encode_outcome(&input.outcome)?,
      executed_at:    Utc::now(),
    };

    let id_str     = encode_uuid(execution.execution_id);
    let app_id     = execution.application_id.clone();
    let var_id_str = execution.variable_id.map(encode_uuid);
    let by         = execution.executed_by.clone();
    let result     = execution.result.clone();
    let at_str     = encode_dt(execution.executed_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO variable_executions
             (id, application_id, variable_id, executed_by, result, executed_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, app_id, var_id_str, by, result, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(execution)
  }

  async fn executions_for_application(
    &self,
    application_id: &str,
  ) -> Result<Vec<VariableExecution>> {
    let app_id = application_id.to_owned();

    let raws: Vec<RawExecution> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, application_id, variable_id, executed_by, result, executed_at
           FROM variable_executions WHERE application_id = ?1
           ORDER BY executed_at, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![app_id], execution_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawExecution::into_execution).collect()
  }

  async fn executions_for_variable(&self, variable_id: Uuid) -> Result<Vec<VariableExecution>> {
    let var_id_str = encode_uuid(variable_id);

    let raws: Vec<RawExecution> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, application_id, variable_id, executed_by, result, executed_at
           FROM variable_executions WHERE variable_id = ?1
           ORDER BY executed_at, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![var_id_str], execution_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawExecution::into_execution).collect()
  }
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn variable_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawVariable> {
  Ok(RawVariable {
    id:               row.get(0)?,
    name:             row.get(1)?,
    description:      row.get(2)?,
    calculation_type: row.get(3)?,
    is_active:        row.get(4)?,
    created_by:       row.get(5)?,
    created_at:       row.get(6)?,
  })
}

fn version_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawVersion> {
  Ok(RawVersion {
    id:             row.get(0)?,
    variable_id:    row.get(1)?,
    version_number: row.get(2)?,
    sql_script:     row.get(3)?,
    change_reason:  row.get(4)?,
    edited_by:      row.get(5)?,
    edited_at:      row.get(6)?,
  })
}

fn result_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawResult> {
  Ok(RawResult {
    id:             row.get(0)?,
    application_id: row.get(1)?,
    variable_id:    row.get(2)?,
    value:          row.get(3)?,
    calculated_by:  row.get(4)?,
    calculated_at:  row.get(5)?,
  })
}

fn execution_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawExecution> {
  Ok(RawExecution {
    id:             row.get(0)?,
    application_id: row.get(1)?,
    variable_id:    row.get(2)?,
    executed_by:    row.get(3)?,
    result:         row.get(4)?,
    executed_at:    row.get(5)?,
  })
}

// ─── Constraint-violation probes ─────────────────────────────────────────────

/// The outcome of one `add_version` transaction attempt.
enum VersionInsert {
  Inserted(i64),
  MissingVariable,
  Conflict,
}

fn unique_violation(e: &rusqlite::Error, needle: &str) -> bool {
  match e {
    rusqlite::Error::SqliteFailure(f, Some(msg)) => {
      f.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(needle)
    }
    _ => false,
  }
}

fn db_unique_violation(e: &tokio_rusqlite::Error, needle: &str) -> bool {
  match e {
    tokio_rusqlite::Error::Rusqlite(inner) => unique_violation(inner, needle),
    _ => false,
  }
}
