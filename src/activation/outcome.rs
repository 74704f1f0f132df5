// ABOUTME: Per-service and per-stage activation outcomes plus activation errors.
// ABOUTME: Stage execution never fails outright; every failure lands in a StageResult.

use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::health::HealthReport;
use crate::types::ServiceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActivationOutcome {
    Success,
    Failure { reason: String },
    Timeout { after_ms: u64 },
    /// Never started: an earlier member of a sequential stage failed, or the stage never got that far.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceOutcome {
    pub service: ServiceId,
    pub activation: ActivationOutcome,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthReport>,
    /// Whether the health report met the stage's success criteria; `None` if not validated.
    pub accepted: Option<bool>,
}

impl ServiceOutcome {
    pub(crate) fn skipped(service: ServiceId) -> Self {
        ServiceOutcome {
            service,
            activation: ActivationOutcome::Skipped,
            attempts: 0,
            health: None,
            accepted: None,
        }
    }

    pub fn was_attempted(&self) -> bool {
        self.activation != ActivationOutcome::Skipped
    }

    pub fn is_active(&self) -> bool {
        self.activation == ActivationOutcome::Success
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.activation,
            ActivationOutcome::Failure { .. } | ActivationOutcome::Timeout { .. }
        ) || self.accepted == Some(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageFailure {
    #[error("stage {stage} requires inactive services: {}", join(.missing))]
    StagePrerequisiteUnmet {
        stage: String,
        missing: Vec<ServiceId>,
    },

    #[error("preparing {service} failed: {reason}")]
    PreparationFailed { service: ServiceId, reason: String },

    #[error("activation failed for {}", join(.services))]
    ActivationFailed { services: Vec<ServiceId> },

    #[error("services did not meet success criteria: {}", join(.services))]
    StageValidationFailed { services: Vec<ServiceId> },
}

fn join(services: &[ServiceId]) -> String {
    services
        .iter()
        .map(ServiceId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageResult {
    pub stage: String,
    pub status: StageStatus,
    /// Declared member order.
    pub outcomes: Vec<ServiceOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
}

impl StageResult {
    pub(crate) fn succeeded(stage: &str, outcomes: Vec<ServiceOutcome>) -> Self {
        StageResult {
            stage: stage.to_string(),
            status: StageStatus::Succeeded,
            outcomes,
            failure: None,
        }
    }

    pub(crate) fn failed(stage: &str, outcomes: Vec<ServiceOutcome>, failure: StageFailure) -> Self {
        StageResult {
            stage: stage.to_string(),
            status: StageStatus::Failed,
            outcomes,
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Succeeded
    }

    /// Services that count against the stage. When the stage could not start
    /// because of unmet prerequisites, that is every member.
    pub fn failed_services(&self) -> BTreeSet<ServiceId> {
        let mut failed: BTreeSet<ServiceId> = self
            .outcomes
            .iter()
            .filter(|o| o.is_failure())
            .map(|o| o.service.clone())
            .collect();
        match &self.failure {
            Some(StageFailure::PreparationFailed { service, .. }) => {
                failed.insert(service.clone());
            }
            // Nothing ran, so the whole stage is what failed to come up.
            Some(StageFailure::StagePrerequisiteUnmet { .. }) => {
                failed.extend(self.outcomes.iter().map(|o| o.service.clone()));
            }
            _ => {}
        }
        failed
    }

    /// Services that were started, whatever the outcome.
    pub fn attempted_services(&self) -> BTreeSet<ServiceId> {
        self.outcomes
            .iter()
            .filter(|o| o.was_attempted())
            .map(|o| o.service.clone())
            .collect()
    }

    pub fn activated_services(&self) -> BTreeSet<ServiceId> {
        self.outcomes
            .iter()
            .filter(|o| o.is_active())
            .map(|o| o.service.clone())
            .collect()
    }

    pub fn outcome_of(&self, service: &ServiceId) -> Option<&ServiceOutcome> {
        self.outcomes.iter().find(|o| &o.service == service)
    }
}

/// Why the activation phase did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    #[error("stage {stage} failed: {failure}")]
    StageFailed { stage: String, failure: StageFailure },

    #[error("integration tests failed: {}", .failures.join("; "))]
    IntegrationFailed { failures: Vec<String> },

    #[error("integration tests did not finish within {0:?}")]
    IntegrationTimeout(Duration),
}
