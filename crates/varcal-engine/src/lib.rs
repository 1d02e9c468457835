//! Calculation coordination for Varcal.
//!
//! [`Engine`] orchestrates one calculation request end to end: resolve the
//! variable and its target version, execute the script against the right
//! data source, upsert the current result, and append an audit entry —
//! always, success or failure.
//!
//! The engine is generic over any [`varcal_core::store::VariableStore`]
//! backend and any [`varcal_core::exec::ScriptExecutor`]; [`SqlExecutor`] is
//! the provided executor over caller-supplied
//! [`varcal_core::exec::QuerySource`] bindings.

pub mod engine;
pub mod error;
pub mod executor;

pub use engine::{Calculation, CalculationRequest, Engine};
pub use error::CalcError;
pub use executor::SqlExecutor;
