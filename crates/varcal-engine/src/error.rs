//! The caller-facing error type for calculations.

use thiserror::Error;
use varcal_core::exec::ExecError;

/// An error surfaced by [`crate::Engine`].
///
/// Resolution failures carry the core taxonomy (`VariableNotFound`,
/// `InactiveVariable`, `NoVersions`, `VersionNotFound`); backend failures
/// are boxed since the store's error type is backend-specific.
#[derive(Debug, Error)]
pub enum CalcError {
  #[error(transparent)]
  Domain(#[from] varcal_core::Error),

  #[error("script execution failed: {0}")]
  Exec(#[from] ExecError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The audit append failed. Fatal for the whole calculation: a result must
  /// never be recorded without at least an attempted audit entry.
  #[error("audit write failed: {0}")]
  AuditWrite(#[source] Box<dyn std::error::Error + Send + Sync>),
}
