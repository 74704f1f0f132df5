// ABOUTME: Error types for service activation, health probes, and rollback procedures.
// ABOUTME: Each capability boundary returns its own typed error.

/// Errors from the service runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("preparation failed: {0}")]
    PreparationFailed(String),

    #[error("activation failed: {0}")]
    ActivationFailed(String),

    #[error("service not found: {0}")]
    NotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Errors from a single health probe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("unhealthy: {0}")]
    Unhealthy(String),
}

/// A rollback procedure could not undo its service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rollback procedure failed: {0}")]
pub struct ProcedureError(pub String);
