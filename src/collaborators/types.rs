// ABOUTME: Values exchanged with external collaborators.
// ABOUTME: Snapshots, provisioning outcomes, findings, test results, alerts, emergency context.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::deploy::DeploymentPhase;
use crate::types::{DeploymentId, ServiceId, SnapshotId};

/// Errors a collaborator reports instead of its normal result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{0}")]
    Failed(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of prerequisite validation. Empty `errors` means the environment is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn with_errors(errors: Vec<String>) -> Self {
        ValidationResult { errors }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runtime configuration captured before preparation touches anything.
///
/// Fields are private so a snapshot cannot be edited after capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSnapshot {
    id: SnapshotId,
    captured_at: DateTime<Utc>,
    values: BTreeMap<String, String>,
}

impl ConfigSnapshot {
    pub fn capture(values: BTreeMap<String, String>) -> Self {
        ConfigSnapshot {
            id: SnapshotId::generate(),
            captured_at: Utc::now(),
            values,
        }
    }

    pub fn id(&self) -> &SnapshotId {
        &self.id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

/// Base configuration merged with environment overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedConfig {
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionedResources {
    pub resources: Vec<String>,
}

impl ProvisionedResources {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    Provisioned(ProvisionedResources),
    /// Some resources were created before provisioning stopped.
    PartialFailure {
        provisioned: ProvisionedResources,
        reason: String,
    },
}

/// Severity of a readiness or compliance finding. Only `Critical` blocks a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub description: String,
}

impl Finding {
    pub fn new(severity: Severity, description: impl Into<String>) -> Self {
        Finding {
            severity,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceTarget {
    pub environment: String,
    pub services: BTreeSet<ServiceId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplianceResult {
    pub violations: Vec<Finding>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationTestResult {
    pub passed: Vec<String>,
    pub failures: Vec<String>,
}

impl IntegrationTestResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitoringResult {
    pub dashboards: Vec<String>,
}

/// Notification raised after an automatic rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub deployment: DeploymentId,
    pub severity: Severity,
    pub summary: String,
}

/// The five readiness categories gating production sign-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessCategory {
    Performance,
    SecurityCompliance,
    OperationalStatus,
    MonitoringSetup,
    Documentation,
}

impl ReadinessCategory {
    pub const ALL: [ReadinessCategory; 5] = [
        ReadinessCategory::Performance,
        ReadinessCategory::SecurityCompliance,
        ReadinessCategory::OperationalStatus,
        ReadinessCategory::MonitoringSetup,
        ReadinessCategory::Documentation,
    ];
}

impl fmt::Display for ReadinessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadinessCategory::Performance => "performance",
            ReadinessCategory::SecurityCompliance => "security compliance",
            ReadinessCategory::OperationalStatus => "operational status",
            ReadinessCategory::MonitoringSetup => "monitoring setup",
            ReadinessCategory::Documentation => "documentation",
        };
        f.write_str(name)
    }
}

/// Everything known about an attempt when an unexpected fault stops it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmergencyContext {
    pub deployment_id: DeploymentId,
    pub deployment: String,
    pub environment: String,
    pub phase: DeploymentPhase,
    pub error: String,
    pub activated_services: BTreeSet<ServiceId>,
    pub failed_services: BTreeSet<ServiceId>,
}
