// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports the orchestrator, its result, phases and error taxonomy.

mod attempt;
mod error;
mod orchestrator;
mod result;
mod state;
mod transitions;

pub use error::{DeploymentError, ErrorKind, FailureContext};
pub use orchestrator::DeploymentOrchestrator;
pub use result::{DeploymentPhase, DeploymentResult, DeploymentStatus, PhaseTransition};
