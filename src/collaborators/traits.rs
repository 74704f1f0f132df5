// ABOUTME: Narrow async interfaces to the systems the orchestrator does not own.
// ABOUTME: Every call returns a typed result; deadlines are applied by the caller.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use super::types::{
    Alert, CollaboratorError, ComplianceResult, ComplianceTarget, ConfigSnapshot, EmergencyContext,
    Finding, IntegrationTestResult, MergedConfig, MonitoringResult, ProvisionedResources,
    ProvisioningOutcome, ReadinessCategory, ValidationResult,
};
use crate::config::{EnvironmentConfig, IntegrationTest, Requirements};
use crate::plan::DeploymentPlan;
use crate::types::ServiceId;

/// Hardware, software, network and security prerequisite checks.
#[async_trait]
pub trait EnvironmentValidator: Send + Sync {
    async fn validate(
        &self,
        env: &EnvironmentConfig,
        plan: &DeploymentPlan,
    ) -> Result<ValidationResult, CollaboratorError>;
}

#[async_trait]
pub trait ConfigurationManager: Send + Sync {
    /// Capture the live configuration before anything changes it.
    async fn snapshot(&self, env: &EnvironmentConfig) -> Result<ConfigSnapshot, CollaboratorError>;

    /// Load the base configuration, apply overrides and validate the result.
    async fn load_merge_validate(
        &self,
        env: &EnvironmentConfig,
        overrides: &BTreeMap<String, String>,
    ) -> Result<MergedConfig, CollaboratorError>;

    /// Push merged configuration to the services that will be activated.
    async fn distribute(
        &self,
        config: &MergedConfig,
        services: &BTreeSet<ServiceId>,
    ) -> Result<(), CollaboratorError>;

    /// Replace the live configuration with a snapshot.
    async fn restore(&self, snapshot: &ConfigSnapshot) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    async fn provision_infrastructure(
        &self,
        requirements: &Requirements,
        allocations: &BTreeMap<String, String>,
    ) -> Result<ProvisioningOutcome, CollaboratorError>;

    async fn release(&self, resources: &ProvisionedResources) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait SecurityScanner: Send + Sync {
    async fn validate_compliance(
        &self,
        target: &ComplianceTarget,
    ) -> Result<ComplianceResult, CollaboratorError>;
}

#[async_trait]
pub trait IntegrationTester: Send + Sync {
    async fn execute_integration_tests(
        &self,
        tests: &[IntegrationTest],
        activated: &BTreeSet<ServiceId>,
    ) -> Result<IntegrationTestResult, CollaboratorError>;
}

#[async_trait]
pub trait MonitoringDashboard: Send + Sync {
    async fn initialize_monitoring(
        &self,
        activated: &BTreeSet<ServiceId>,
    ) -> Result<MonitoringResult, CollaboratorError>;

    async fn send_alert(&self, alert: &Alert) -> Result<(), CollaboratorError>;
}

/// Readiness checks other than security compliance, which goes through [`SecurityScanner`].
#[async_trait]
pub trait ReadinessAssessor: Send + Sync {
    async fn assess(
        &self,
        category: ReadinessCategory,
        services: &BTreeSet<ServiceId>,
    ) -> Result<Vec<Finding>, CollaboratorError>;
}

/// Last-resort hook invoked when an attempt hits an unexpected fault.
#[async_trait]
pub trait EmergencyProcedures: Send + Sync {
    async fn execute(&self, context: &EmergencyContext) -> Result<(), CollaboratorError>;
}
