// ABOUTME: External collaborator contracts consumed by the orchestrator.
// ABOUTME: Bundles every capability a deployment attempt needs behind shared trait objects.

mod configuration;
mod traits;
mod types;

pub use configuration::InMemoryConfiguration;
pub use traits::{
    ConfigurationManager, EmergencyProcedures, EnvironmentValidator, IntegrationTester,
    MonitoringDashboard, ReadinessAssessor, ResourceProvisioner, SecurityScanner,
};
pub use types::{
    Alert, CollaboratorError, ComplianceResult, ComplianceTarget, ConfigSnapshot, EmergencyContext,
    Finding, IntegrationTestResult, MergedConfig, MonitoringResult, ProvisionedResources,
    ProvisioningOutcome, ReadinessCategory, Severity, ValidationResult,
};

use std::sync::Arc;

use crate::runtime::{HealthProbe, ServiceRuntime};

/// Every external capability used by one orchestrator.
#[derive(Clone)]
pub struct Collaborators {
    pub runtime: Arc<dyn ServiceRuntime>,
    pub probe: Arc<dyn HealthProbe>,
    pub environment: Arc<dyn EnvironmentValidator>,
    pub configuration: Arc<dyn ConfigurationManager>,
    pub provisioner: Arc<dyn ResourceProvisioner>,
    pub security: Arc<dyn SecurityScanner>,
    pub integration: Arc<dyn IntegrationTester>,
    pub monitoring: Arc<dyn MonitoringDashboard>,
    pub readiness: Arc<dyn ReadinessAssessor>,
    pub emergency: Arc<dyn EmergencyProcedures>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
