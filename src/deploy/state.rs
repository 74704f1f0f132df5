// ABOUTME: Attempt state types for the type state pattern.
// ABOUTME: Each state carries exactly what later phases and rollback need.

use crate::collaborators::{ConfigSnapshot, ProvisionedResources};
use crate::graph::DependencyGraph;

/// Initial state: nothing checked yet.
/// Available actions: `validate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Validating;

/// Prerequisites met and the dependency graph is valid.
/// Available actions: `prepare()`
#[derive(Debug, Clone)]
pub struct Validated {
    pub(crate) graph: DependencyGraph,
}

/// Configuration snapshotted and distributed, infrastructure provisioned.
/// Available actions: `activate()`
#[derive(Debug, Clone)]
pub struct Prepared {
    pub(crate) graph: DependencyGraph,
    pub(crate) snapshot: ConfigSnapshot,
    pub(crate) infrastructure: ProvisionedResources,
}

/// Every stage active and integration tests passed.
/// Available actions: `validate_readiness()`
#[derive(Debug, Clone)]
pub struct Activated {
    pub(crate) prepared: Prepared,
}

/// Readiness passed with at most warnings.
/// Available actions: `finalize()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Ready;
