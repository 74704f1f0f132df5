// ABOUTME: Service runtime trait for preparing, activating, and isolating services.
// ABOUTME: Implemented by whatever actually runs services (containers, VMs, processes).

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::error::ServiceError;
use crate::plan::ServiceSpec;
use crate::types::ServiceId;

/// Lifecycle operations on a single service.
#[async_trait]
pub trait ServiceRuntime: Send + Sync {
    /// Apply stage-level overrides to a service before it is activated.
    async fn prepare(
        &self,
        service: &ServiceSpec,
        overrides: &BTreeMap<String, String>,
    ) -> Result<(), ServiceError>;

    /// Bring a service up. Deadlines are enforced by the caller.
    async fn activate(&self, service: &ServiceSpec) -> Result<(), ServiceError>;

    /// Stop routing new work to a service. Must be a no-op when already isolated.
    async fn isolate(&self, service: &ServiceId) -> Result<(), ServiceError>;

    /// Whether the service is still observably running.
    async fn is_active(&self, service: &ServiceId) -> Result<bool, ServiceError>;
}
