// ABOUTME: Runtime form of a service: its declaration plus its rollback capability.
// ABOUTME: Shared read-only for the duration of a deployment attempt.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use super::procedures::RollbackProcedure;
use crate::config::{PerformanceBaseline, ReadinessProbe, RetryConfig, ServiceConfig, ServiceKind};
use crate::types::ServiceId;

#[derive(Clone)]
pub struct ServiceSpec {
    pub id: ServiceId,
    pub kind: ServiceKind,
    pub dependencies: BTreeSet<ServiceId>,
    pub health_endpoint: String,
    pub readiness_probes: Vec<ReadinessProbe>,
    pub performance_baselines: Vec<PerformanceBaseline>,
    pub activation_timeout: Duration,
    pub retry: RetryConfig,
    pub rollback_procedure: Arc<dyn RollbackProcedure>,
}

impl ServiceSpec {
    pub fn new(config: ServiceConfig, rollback_procedure: Arc<dyn RollbackProcedure>) -> Self {
        ServiceSpec {
            id: config.id,
            kind: config.kind,
            dependencies: config.dependencies,
            health_endpoint: config.health_endpoint,
            readiness_probes: config.readiness_probes,
            performance_baselines: config.performance_baselines,
            activation_timeout: config.activation_timeout,
            retry: config.retry,
            rollback_procedure,
        }
    }
}

impl std::fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("dependencies", &self.dependencies)
            .field("health_endpoint", &self.health_endpoint)
            .field("activation_timeout", &self.activation_timeout)
            .finish_non_exhaustive()
    }
}
