// ABOUTME: Health probe trait used by the health validator.
// ABOUTME: One method per probe tier; the validator owns ordering and deadlines.

use async_trait::async_trait;

use super::error::ProbeError;
use crate::config::ReadinessProbe;
use crate::plan::ServiceSpec;

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe the primary health endpoint of a service.
    async fn check_endpoint(&self, service: &ServiceSpec) -> Result<(), ProbeError>;

    /// Run one named readiness probe against a service.
    async fn check_readiness(
        &self,
        service: &ServiceSpec,
        probe: &ReadinessProbe,
    ) -> Result<(), ProbeError>;

    /// Sample the current value of a runtime metric.
    async fn sample_metric(&self, service: &ServiceSpec, metric: &str) -> Result<f64, ProbeError>;
}
