//! [`SqlExecutor`] — dispatches script execution to the bound data sources.
//!
//! The executor holds one [`QuerySource`] per calculation type: a live
//! transactional binding, a warehouse binding, and an optional hybrid
//! binding (a federated capability spanning both, supplied by the
//! data-source collaborator — the executor never merges sources itself).

use std::time::Duration;

use varcal_core::{
  exec::{ApplicationContext, ExecError, QuerySource, Row, ScriptExecutor, SourceError},
  value::ScriptValue,
  variable::CalculationType,
};

/// Default per-execution deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Unbound slot ────────────────────────────────────────────────────────────

/// Placeholder for an unbound source slot; every query fails as unavailable.
#[derive(Debug, Clone, Copy)]
pub struct Unbound;

impl QuerySource for Unbound {
  async fn query(
    &self,
    _script: &str,
    _params: &[(String, ScriptValue)],
  ) -> Result<Vec<Row>, SourceError> {
    Err(SourceError::Unavailable("no source bound".to_owned()))
  }
}

// ─── Executor ────────────────────────────────────────────────────────────────

/// Executes variable scripts against the source implied by their calculation
/// type, with a per-execution deadline.
///
/// On timeout the in-flight query future is dropped, cancelling the source
/// call rather than leaving it running. The executor never retries; retry
/// policy belongs to the caller.
pub struct SqlExecutor<L, D, H = Unbound> {
  live:    L,
  dwh:     D,
  hybrid:  Option<H>,
  timeout: Duration,
}

impl<L: QuerySource, D: QuerySource> SqlExecutor<L, D> {
  /// An executor with live and warehouse bindings and no hybrid binding.
  pub fn new(live: L, dwh: D) -> Self {
    Self {
      live,
      dwh,
      hybrid: None,
      timeout: DEFAULT_TIMEOUT,
    }
  }
}

impl<L: QuerySource, D: QuerySource, H: QuerySource> SqlExecutor<L, D, H> {
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Bind the hybrid source, unlocking `CalculationType::Hybrid` scripts.
  pub fn with_hybrid<H2: QuerySource>(self, hybrid: H2) -> SqlExecutor<L, D, H2> {
    SqlExecutor {
      live:    self.live,
      dwh:     self.dwh,
      hybrid:  Some(hybrid),
      timeout: self.timeout,
    }
  }

  async fn run<S: QuerySource>(
    &self,
    source: &S,
    script: &str,
    ctx: &ApplicationContext,
  ) -> Result<ScriptValue, ExecError> {
    let params = ctx.bind_params();
    let rows = tokio::time::timeout(self.timeout, source.query(script, &params))
      .await
      .map_err(|_| ExecError::Timeout(self.timeout))??;
    shape_value(rows)
  }
}

impl<L: QuerySource, D: QuerySource, H: QuerySource> ScriptExecutor for SqlExecutor<L, D, H> {
  async fn execute(
    &self,
    script: &str,
    calculation_type: CalculationType,
    ctx: &ApplicationContext,
  ) -> Result<ScriptValue, ExecError> {
    match calculation_type {
      CalculationType::Live => self.run(&self.live, script, ctx).await,
      CalculationType::Dwh => self.run(&self.dwh, script, ctx).await,
      CalculationType::Hybrid => match &self.hybrid {
        Some(hybrid) => self.run(hybrid, script, ctx).await,
        None => Err(ExecError::SourceUnavailable(
          "no hybrid source bound".to_owned(),
        )),
      },
    }
  }
}

// ─── Result shaping ──────────────────────────────────────────────────────────

/// Shape a row set into the single value the engine stores.
///
/// Zero rows is a legitimate "no value"; one row collapses to its single
/// column or to a structured row; anything more violates the script contract.
fn shape_value(mut rows: Vec<Row>) -> Result<ScriptValue, ExecError> {
  match rows.len() {
    0 => Ok(ScriptValue::Null),
    1 => {
      let row = rows.remove(0);
      match row.len() {
        0 => Ok(ScriptValue::Null),
        1 => match row.into_iter().next() {
          Some((_, value)) => Ok(value),
          None => Ok(ScriptValue::Null),
        },
        _ => Ok(ScriptValue::Row(row.into_iter().collect())),
      }
    }
    n => Err(ExecError::ScriptContract(format!(
      "expected at most one row, got {n}"
    ))),
  }
}
