//! Integration tests for `SqliteStore` against an in-memory database.

use uuid::Uuid;
use varcal_core::{
  record::{ExecutionOutcome, NewExecution, NewResult},
  store::VariableStore,
  value::ScriptValue,
  variable::{CalculationType, NewVariable},
  version::NewVersion,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn live_var(name: &str) -> NewVariable {
  NewVariable::new(name, CalculationType::Live, "analyst")
}

fn script_version(variable_id: Uuid, script: &str) -> NewVersion {
  NewVersion::new(variable_id, script, "analyst")
}

fn success(value: ScriptValue) -> ExecutionOutcome {
  ExecutionOutcome::Success(value)
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_and_get_variable() {
  let s = store().await;

  let variable = s.register_variable(live_var("credit_score")).await.unwrap();
  assert_eq!(variable.name, "credit_score");
  assert!(variable.is_active);

  let fetched = s.get_variable(variable.variable_id).await.unwrap().unwrap();
  assert_eq!(fetched.variable_id, variable.variable_id);
  assert_eq!(fetched.calculation_type, CalculationType::Live);
}

#[tokio::test]
async fn register_duplicate_name_errors() {
  let s = store().await;
  s.register_variable(live_var("dti_ratio")).await.unwrap();

  let err = s.register_variable(live_var("dti_ratio")).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(varcal_core::Error::DuplicateName(ref name)) if name == "dti_ratio"
  ));
}

#[tokio::test]
async fn find_variable_by_name() {
  let s = store().await;
  let variable = s.register_variable(live_var("utilisation")).await.unwrap();

  let found = s.find_variable("utilisation").await.unwrap().unwrap();
  assert_eq!(found.variable_id, variable.variable_id);

  assert!(s.find_variable("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn list_variables_active_only() {
  let s = store().await;
  s.register_variable(live_var("a")).await.unwrap();
  let b = s.register_variable(live_var("b")).await.unwrap();
  s.register_variable(live_var("c")).await.unwrap();

  s.set_active(b.variable_id, false).await.unwrap();

  let all = s.list_variables(false).await.unwrap();
  assert_eq!(all.len(), 3);

  let active = s.list_variables(true).await.unwrap();
  assert_eq!(active.len(), 2);
  assert!(active.iter().all(|v| v.is_active));
}

#[tokio::test]
async fn set_active_is_idempotent() {
  let s = store().await;
  let variable = s.register_variable(live_var("income")).await.unwrap();

  let off = s.set_active(variable.variable_id, false).await.unwrap().unwrap();
  assert!(!off.is_active);

  // Toggling to the same state again is a no-op, not an error.
  let off_again = s.set_active(variable.variable_id, false).await.unwrap().unwrap();
  assert!(!off_again.is_active);

  let on = s.set_active(variable.variable_id, true).await.unwrap().unwrap();
  assert!(on.is_active);
}

#[tokio::test]
async fn set_active_missing_returns_none() {
  let s = store().await;
  assert!(s.set_active(Uuid::new_v4(), false).await.unwrap().is_none());
}

// ─── Versions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn version_numbers_are_contiguous_from_one() {
  let s = store().await;
  let variable = s.register_variable(live_var("score")).await.unwrap();

  for expected in 1..=3u32 {
    let version = s
      .add_version(script_version(variable.variable_id, "SELECT 1"))
      .await
      .unwrap();
    assert_eq!(version.version_number, expected);
  }

  let all = s.list_versions(variable.variable_id).await.unwrap();
  let numbers: Vec<u32> = all.iter().map(|v| v.version_number).collect();
  assert_eq!(numbers, vec![1, 2, 3]);
}

#[tokio::test]
async fn concurrent_add_versions_stay_unique() {
  let s = store().await;
  let variable = s.register_variable(live_var("score")).await.unwrap();

  let (a, b, c, d) = tokio::join!(
    s.add_version(script_version(variable.variable_id, "SELECT 1")),
    s.add_version(script_version(variable.variable_id, "SELECT 2")),
    s.add_version(script_version(variable.variable_id, "SELECT 3")),
    s.add_version(script_version(variable.variable_id, "SELECT 4")),
  );

  let mut numbers = vec![
    a.unwrap().version_number,
    b.unwrap().version_number,
    c.unwrap().version_number,
    d.unwrap().version_number,
  ];
  numbers.sort_unstable();
  assert_eq!(numbers, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn add_version_missing_variable_errors() {
  let s = store().await;

  let err = s
    .add_version(script_version(Uuid::new_v4(), "SELECT 1"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(varcal_core::Error::VariableNotFound(_))
  ));
}

#[tokio::test]
async fn current_version_is_the_highest() {
  let s = store().await;
  let variable = s.register_variable(live_var("score")).await.unwrap();

  assert!(s.current_version(variable.variable_id).await.unwrap().is_none());

  s.add_version(script_version(variable.variable_id, "SELECT old"))
    .await
    .unwrap();
  s.add_version(
    script_version(variable.variable_id, "SELECT new").with_reason("fix rounding"),
  )
  .await
  .unwrap();

  let current = s.current_version(variable.variable_id).await.unwrap().unwrap();
  assert_eq!(current.version_number, 2);
  assert_eq!(current.sql_script, "SELECT new");
  assert_eq!(current.change_reason.as_deref(), Some("fix rounding"));
}

#[tokio::test]
async fn get_version_pins_an_older_script() {
  let s = store().await;
  let variable = s.register_variable(live_var("score")).await.unwrap();

  s.add_version(script_version(variable.variable_id, "SELECT old"))
    .await
    .unwrap();
  s.add_version(script_version(variable.variable_id, "SELECT new"))
    .await
    .unwrap();

  let pinned = s.get_version(variable.variable_id, 1).await.unwrap().unwrap();
  assert_eq!(pinned.sql_script, "SELECT old");

  assert!(s.get_version(variable.variable_id, 9).await.unwrap().is_none());
}

// ─── Results ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_creates_then_overwrites_in_place() {
  let s = store().await;
  let variable = s.register_variable(live_var("score")).await.unwrap();

  let first = s
    .upsert_result(NewResult {
      application_id: "A100".into(),
      variable_id:    variable.variable_id,
      value:          ScriptValue::Integer(640),
      calculated_by:  "engine".into(),
    })
    .await
    .unwrap();
  assert_eq!(first.value, ScriptValue::Integer(640));

  let second = s
    .upsert_result(NewResult {
      application_id: "A100".into(),
      variable_id:    variable.variable_id,
      value:          ScriptValue::Integer(715),
      calculated_by:  "engine".into(),
    })
    .await
    .unwrap();

  // Same row, overwritten value; still exactly one row for the pair.
  assert_eq!(second.result_id, first.result_id);
  assert_eq!(second.value, ScriptValue::Integer(715));

  let all = s.results_for_application("A100").await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn get_result_missing_returns_none() {
  let s = store().await;
  let variable = s.register_variable(live_var("score")).await.unwrap();

  assert!(
    s.get_result("A404", variable.variable_id)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn results_for_application_lists_one_per_variable() {
  let s = store().await;
  let score = s.register_variable(live_var("score")).await.unwrap();
  let dti = s.register_variable(live_var("dti")).await.unwrap();

  for variable_id in [score.variable_id, dti.variable_id] {
    s.upsert_result(NewResult {
      application_id: "A100".into(),
      variable_id,
      value: ScriptValue::Integer(1),
      calculated_by: "engine".into(),
    })
    .await
    .unwrap();
  }

  let rows = s.results_for_application("A100").await.unwrap();
  assert_eq!(rows.len(), 2);
  assert!(s.results_for_application("A999").await.unwrap().is_empty());
}

#[tokio::test]
async fn null_value_round_trips() {
  let s = store().await;
  let variable = s.register_variable(live_var("score")).await.unwrap();

  s.upsert_result(NewResult {
    application_id: "A100".into(),
    variable_id:    variable.variable_id,
    value:          ScriptValue::Null,
    calculated_by:  "engine".into(),
  })
  .await
  .unwrap();

  let fetched = s
    .get_result("A100", variable.variable_id)
    .await
    .unwrap()
    .unwrap();
  assert!(fetched.value.is_null());
}

// ─── Audit log ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn executions_accumulate_per_attempt() {
  let s = store().await;
  let variable = s.register_variable(live_var("score")).await.unwrap();

  s.append_execution(NewExecution {
    application_id: "A100".into(),
    variable_id:    Some(variable.variable_id),
    executed_by:    "engine".into(),
    outcome:        success(ScriptValue::Integer(640)),
  })
  .await
  .unwrap();
  s.append_execution(NewExecution {
    application_id: "A100".into(),
    variable_id:    Some(variable.variable_id),
    executed_by:    "engine".into(),
    outcome:        ExecutionOutcome::Failure("data source unavailable: dwh".into()),
  })
  .await
  .unwrap();
  s.append_execution(NewExecution {
    application_id: "A100".into(),
    variable_id:    Some(variable.variable_id),
    executed_by:    "engine".into(),
    outcome:        success(ScriptValue::Integer(715)),
  })
  .await
  .unwrap();

  let rows = s.executions_for_application("A100").await.unwrap();
  assert_eq!(rows.len(), 3);
  assert_eq!(rows[0].result.as_deref(), Some("640"));
  assert_eq!(
    rows[1].result.as_deref(),
    Some("data source unavailable: dwh")
  );
  assert_eq!(rows[2].result.as_deref(), Some("715"));

  let by_variable = s
    .executions_for_variable(variable.variable_id)
    .await
    .unwrap();
  assert_eq!(by_variable.len(), 3);
}

#[tokio::test]
async fn null_success_outcome_stores_no_text() {
  let s = store().await;
  let variable = s.register_variable(live_var("score")).await.unwrap();

  let row = s
    .append_execution(NewExecution {
      application_id: "A100".into(),
      variable_id:    Some(variable.variable_id),
      executed_by:    "engine".into(),
      outcome:        success(ScriptValue::Null),
    })
    .await
    .unwrap();
  assert!(row.result.is_none());
}

// ─── Deletion semantics ──────────────────────────────────────────────────────

#[tokio::test]
async fn deactivation_preserves_results_and_history() {
  let s = store().await;
  let variable = s.register_variable(live_var("score")).await.unwrap();
  s.add_version(script_version(variable.variable_id, "SELECT 1"))
    .await
    .unwrap();
  s.upsert_result(NewResult {
    application_id: "A100".into(),
    variable_id:    variable.variable_id,
    value:          ScriptValue::Integer(640),
    calculated_by:  "engine".into(),
  })
  .await
  .unwrap();
  s.append_execution(NewExecution {
    application_id: "A100".into(),
    variable_id:    Some(variable.variable_id),
    executed_by:    "engine".into(),
    outcome:        success(ScriptValue::Integer(640)),
  })
  .await
  .unwrap();

  s.set_active(variable.variable_id, false).await.unwrap();

  assert!(
    s.get_result("A100", variable.variable_id)
      .await
      .unwrap()
      .is_some()
  );
  assert_eq!(
    s.executions_for_variable(variable.variable_id)
      .await
      .unwrap()
      .len(),
    1
  );
}

#[tokio::test]
async fn delete_cascades_to_versions_and_results_but_not_executions() {
  let s = store().await;
  let variable = s.register_variable(live_var("score")).await.unwrap();
  s.add_version(script_version(variable.variable_id, "SELECT 1"))
    .await
    .unwrap();
  s.upsert_result(NewResult {
    application_id: "A100".into(),
    variable_id:    variable.variable_id,
    value:          ScriptValue::Integer(640),
    calculated_by:  "engine".into(),
  })
  .await
  .unwrap();
  s.append_execution(NewExecution {
    application_id: "A100".into(),
    variable_id:    Some(variable.variable_id),
    executed_by:    "engine".into(),
    outcome:        success(ScriptValue::Integer(640)),
  })
  .await
  .unwrap();

  assert!(s.delete_variable(variable.variable_id).await.unwrap());
  assert!(!s.delete_variable(variable.variable_id).await.unwrap());

  // Current state is gone with the variable.
  assert!(s.get_variable(variable.variable_id).await.unwrap().is_none());
  assert!(s.list_versions(variable.variable_id).await.unwrap().is_empty());
  assert!(
    s.get_result("A100", variable.variable_id)
      .await
      .unwrap()
      .is_none()
  );

  // History survives with a nulled variable reference.
  let history = s.executions_for_application("A100").await.unwrap();
  assert_eq!(history.len(), 1);
  assert!(history[0].variable_id.is_none());
  assert_eq!(history[0].result.as_deref(), Some("640"));
}
