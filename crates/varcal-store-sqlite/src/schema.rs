//! SQL schema for the Varcal SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// The cascade asymmetry is deliberate: versions and results are "current
/// state" and die with their variable; execution rows are permanent history
/// and keep a nulled reference instead.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS variables (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL UNIQUE,
    description      TEXT,
    calculation_type TEXT NOT NULL,              -- 'live' | 'dwh' | 'hybrid'
    is_active        INTEGER NOT NULL DEFAULT 1,
    created_by       TEXT NOT NULL,
    created_at       TEXT NOT NULL               -- ISO 8601 UTC; store-assigned
);

-- Versions are strictly append-only. A script is never corrected in place;
-- corrections create a new version with the next number.
CREATE TABLE IF NOT EXISTS variable_versions (
    id             TEXT PRIMARY KEY,
    variable_id    TEXT NOT NULL REFERENCES variables(id) ON DELETE CASCADE,
    version_number INTEGER NOT NULL,
    sql_script     TEXT NOT NULL,
    change_reason  TEXT,
    edited_by      TEXT NOT NULL,
    edited_at      TEXT NOT NULL,
    UNIQUE (variable_id, version_number)
);

-- At most one current value per (application, variable); overwritten on
-- recalculation. History lives in variable_executions only.
CREATE TABLE IF NOT EXISTS variable_results (
    id             TEXT PRIMARY KEY,
    application_id TEXT NOT NULL,
    variable_id    TEXT NOT NULL REFERENCES variables(id) ON DELETE CASCADE,
    value          TEXT,                         -- compact JSON; NULL = no value
    calculated_by  TEXT NOT NULL,
    calculated_at  TEXT NOT NULL,
    UNIQUE (application_id, variable_id)
);

-- Append-only audit of every calculation attempt, success or failure.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS variable_executions (
    id             TEXT PRIMARY KEY,
    application_id TEXT NOT NULL,
    variable_id    TEXT REFERENCES variables(id) ON DELETE SET NULL,
    executed_by    TEXT NOT NULL,
    result         TEXT,                         -- value JSON or error text
    executed_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS versions_variable_idx      ON variable_versions(variable_id);
CREATE INDEX IF NOT EXISTS results_application_idx    ON variable_results(application_id);
CREATE INDEX IF NOT EXISTS executions_application_idx ON variable_executions(application_id);
CREATE INDEX IF NOT EXISTS executions_variable_idx    ON variable_executions(variable_id);

PRAGMA user_version = 1;
";
