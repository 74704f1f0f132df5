// ABOUTME: Terminal result of one deployment attempt and the phases it moves through.
// ABOUTME: Built once at the end of the attempt; read-only afterwards.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use super::error::FailureContext;
use crate::activation::StageResult;
use crate::collaborators::{IntegrationTestResult, MonitoringResult};
use crate::diagnostics::Warning;
use crate::readiness::ReadinessReport;
use crate::rollback::{RollbackOutcome, RollbackResult};
use crate::types::{DeploymentId, ServiceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    Validating,
    Preparing,
    Activating,
    ValidatingReadiness,
    Finalizing,
    Completed,
    Failed,
    RolledBack,
}

impl DeploymentPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeploymentPhase::Completed | DeploymentPhase::Failed | DeploymentPhase::RolledBack
        )
    }
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentPhase::Validating => "validating",
            DeploymentPhase::Preparing => "preparing",
            DeploymentPhase::Activating => "activating",
            DeploymentPhase::ValidatingReadiness => "validating readiness",
            DeploymentPhase::Finalizing => "finalizing",
            DeploymentPhase::Completed => "completed",
            DeploymentPhase::Failed => "failed",
            DeploymentPhase::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    pub phase: DeploymentPhase,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentResult {
    pub(crate) id: DeploymentId,
    pub(crate) deployment: String,
    pub(crate) environment: String,
    pub(crate) status: DeploymentStatus,
    pub(crate) phase: DeploymentPhase,
    pub(crate) stage_results: Vec<StageResult>,
    pub(crate) activated_services: BTreeSet<ServiceId>,
    pub(crate) failed_services: BTreeSet<ServiceId>,
    pub(crate) integration: Option<IntegrationTestResult>,
    pub(crate) rollback: Option<RollbackResult>,
    pub(crate) readiness: Option<ReadinessReport>,
    pub(crate) monitoring: Option<MonitoringResult>,
    pub(crate) error: Option<FailureContext>,
    pub(crate) warnings: Vec<Warning>,
    pub(crate) history: Vec<PhaseTransition>,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) finished_at: DateTime<Utc>,
}

impl DeploymentResult {
    pub fn id(&self) -> &DeploymentId {
        &self.id
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn status(&self) -> DeploymentStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == DeploymentStatus::Success
    }

    /// Terminal phase: `Completed`, `Failed` or `RolledBack`.
    pub fn phase(&self) -> DeploymentPhase {
        self.phase
    }

    /// Executed stages, in order. Stages after a failure are absent.
    pub fn stage_results(&self) -> &[StageResult] {
        &self.stage_results
    }

    pub fn stage(&self, name: &str) -> Option<&StageResult> {
        self.stage_results.iter().find(|s| s.stage == name)
    }

    /// Services that reached an active state during the attempt, including
    /// any later rolled back. See [`Self::live_services`] for what is still up.
    pub fn activated_services(&self) -> &BTreeSet<ServiceId> {
        &self.activated_services
    }

    /// Services a rollback confirmed stopped.
    pub fn rolled_back_services(&self) -> BTreeSet<ServiceId> {
        self.rollback
            .iter()
            .flat_map(|rollback| &rollback.services)
            .filter(|entry| entry.outcome != RollbackOutcome::Unrecoverable)
            .map(|entry| entry.service.clone())
            .collect()
    }

    /// Activated services not confirmed stopped by a rollback.
    pub fn live_services(&self) -> BTreeSet<ServiceId> {
        let rolled_back = self.rolled_back_services();
        self.activated_services
            .difference(&rolled_back)
            .cloned()
            .collect()
    }

    pub fn failed_services(&self) -> &BTreeSet<ServiceId> {
        &self.failed_services
    }

    pub fn integration(&self) -> Option<&IntegrationTestResult> {
        self.integration.as_ref()
    }

    pub fn rollback(&self) -> Option<&RollbackResult> {
        self.rollback.as_ref()
    }

    pub fn readiness(&self) -> Option<&ReadinessReport> {
        self.readiness.as_ref()
    }

    pub fn monitoring(&self) -> Option<&MonitoringResult> {
        self.monitoring.as_ref()
    }

    pub fn error(&self) -> Option<&FailureContext> {
        self.error.as_ref()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Every phase entered, with the time it was entered.
    pub fn history(&self) -> &[PhaseTransition] {
        &self.history
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
