// ABOUTME: Deployment error taxonomy with SNAFU pattern.
// ABOUTME: One variant per failing phase, plus a serializable summary for results.

use serde::Serialize;
use snafu::Snafu;

use super::result::DeploymentPhase;
use crate::activation::ActivationError;
use crate::graph::GraphError;

/// Why a deployment attempt stopped.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DeploymentError {
    #[snafu(display("environment validation failed: {}", errors.join("; ")))]
    Validation { errors: Vec<String> },

    #[snafu(display("invalid dependency graph: {source}"))]
    Graph { source: GraphError },

    #[snafu(display("preparation failed: {reason}"))]
    Preparation { reason: String },

    #[snafu(display("activation failed: {source}"))]
    Activation { source: ActivationError },

    #[snafu(display("not production ready: {}", issues.join("; ")))]
    Readiness { issues: Vec<String> },

    #[snafu(display("unexpected fault while {phase}: {message}"))]
    Unexpected {
        phase: DeploymentPhase,
        message: String,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Prerequisites unmet or the service graph is invalid. Nothing was started.
    Validation,
    /// Configuration or infrastructure setup failed. Only cleanup was needed.
    Preparation,
    /// A stage or the integration tests failed.
    Activation,
    /// Critical production readiness issues.
    Readiness,
    /// A fault nothing else handled.
    Unexpected,
}

impl DeploymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeploymentError::Validation { .. } | DeploymentError::Graph { .. } => {
                ErrorKind::Validation
            }
            DeploymentError::Preparation { .. } => ErrorKind::Preparation,
            DeploymentError::Activation { .. } => ErrorKind::Activation,
            DeploymentError::Readiness { .. } => ErrorKind::Readiness,
            DeploymentError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// The graph problem, if validation failed on the dependency graph.
    pub fn graph_error(&self) -> Option<&GraphError> {
        match self {
            DeploymentError::Graph { source } => Some(source),
            _ => None,
        }
    }
}

impl From<GraphError> for DeploymentError {
    fn from(source: GraphError) -> Self {
        DeploymentError::Graph { source }
    }
}

impl From<ActivationError> for DeploymentError {
    fn from(source: ActivationError) -> Self {
        DeploymentError::Activation { source }
    }
}

/// Error summary carried by a failed `DeploymentResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureContext {
    pub kind: ErrorKind,
    /// Phase that was running when the failure happened.
    pub phase: DeploymentPhase,
    pub message: String,
    #[serde(skip)]
    pub graph: Option<GraphError>,
}

impl FailureContext {
    pub(crate) fn new(phase: DeploymentPhase, error: &DeploymentError) -> Self {
        FailureContext {
            kind: error.kind(),
            phase,
            message: error.to_string(),
            graph: error.graph_error().cloned(),
        }
    }
}
