//! The `VariableStore` trait.
//!
//! Implemented by storage backends (e.g. `varcal-store-sqlite`). The engine
//! depends on this abstraction, not on any concrete backend. Correctness
//! under concurrency relies on the backend's uniqueness constraints and
//! transactional isolation, never on in-process locking.

use std::future::Future;

use uuid::Uuid;

use crate::{
  record::{NewExecution, NewResult, VariableExecution, VariableResult},
  variable::{NewVariable, Variable},
  version::{NewVersion, VariableVersion},
};

/// Abstraction over a Varcal storage backend.
///
/// Covers the four persisted entities: variables, versions, results, and the
/// execution audit log. Reads that can miss return `Option`; the caller
/// decides which misses are errors.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait VariableStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Registry ──────────────────────────────────────────────────────────

  /// Register a new variable. Fails if the name is already taken; the
  /// backend's unique constraint is the arbiter, not a read-then-write.
  fn register_variable(
    &self,
    input: NewVariable,
  ) -> impl Future<Output = Result<Variable, Self::Error>> + Send + '_;

  /// Retrieve a variable by id. Works for inactive variables.
  fn get_variable(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Variable>, Self::Error>> + Send + '_;

  /// Retrieve a variable by its unique name. Works for inactive variables.
  fn find_variable<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Variable>, Self::Error>> + Send + 'a;

  /// List variables, optionally restricted to active ones.
  fn list_variables(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<Variable>, Self::Error>> + Send + '_;

  /// Toggle `is_active`. Idempotent. Returns the updated variable, or `None`
  /// if no variable has this id.
  fn set_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<Option<Variable>, Self::Error>> + Send + '_;

  /// Hard-delete a variable. Cascades to its versions and results; audit
  /// rows survive with a nulled variable reference. Returns `false` if no
  /// variable has this id.
  fn delete_variable(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Versions — append-only writes ─────────────────────────────────────

  /// Append a new version with number `max + 1` (1 for the first), computed
  /// atomically with the insert so concurrent edits never collide.
  fn add_version(
    &self,
    input: NewVersion,
  ) -> impl Future<Output = Result<VariableVersion, Self::Error>> + Send + '_;

  /// The version with the highest number, or `None` if the variable has no
  /// versions yet.
  fn current_version(
    &self,
    variable_id: Uuid,
  ) -> impl Future<Output = Result<Option<VariableVersion>, Self::Error>> + Send + '_;

  /// A specific pinned version.
  fn get_version(
    &self,
    variable_id: Uuid,
    number: u32,
  ) -> impl Future<Output = Result<Option<VariableVersion>, Self::Error>> + Send + '_;

  /// All versions of a variable, ascending by number.
  fn list_versions(
    &self,
    variable_id: Uuid,
  ) -> impl Future<Output = Result<Vec<VariableVersion>, Self::Error>> + Send + '_;

  // ── Results ───────────────────────────────────────────────────────────

  /// Insert or overwrite the single result row for the pair. The upsert is
  /// the atomicity boundary; the row id is stable across overwrites.
  fn upsert_result(
    &self,
    input: NewResult,
  ) -> impl Future<Output = Result<VariableResult, Self::Error>> + Send + '_;

  /// The current result for the pair, or `None` if never calculated.
  fn get_result<'a>(
    &'a self,
    application_id: &'a str,
    variable_id: Uuid,
  ) -> impl Future<Output = Result<Option<VariableResult>, Self::Error>> + Send + 'a;

  /// One result per distinct variable ever calculated for the application.
  fn results_for_application<'a>(
    &'a self,
    application_id: &'a str,
  ) -> impl Future<Output = Result<Vec<VariableResult>, Self::Error>> + Send + 'a;

  // ── Audit log — append-only ───────────────────────────────────────────

  /// Append one audit row. Never mutated after insert.
  fn append_execution(
    &self,
    input: NewExecution,
  ) -> impl Future<Output = Result<VariableExecution, Self::Error>> + Send + '_;

  /// All attempts for an application, chronologically ordered.
  fn executions_for_application<'a>(
    &'a self,
    application_id: &'a str,
  ) -> impl Future<Output = Result<Vec<VariableExecution>, Self::Error>> + Send + 'a;

  /// All attempts for a variable, chronologically ordered.
  fn executions_for_variable(
    &self,
    variable_id: Uuid,
  ) -> impl Future<Output = Result<Vec<VariableExecution>, Self::Error>> + Send + '_;
}
