// ABOUTME: Outcome types for a rollback run.
// ABOUTME: Per-service outcomes in teardown order plus the overall status.

use serde::Serialize;

use crate::types::ServiceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackOutcome {
    Success,
    Failed,
    /// Still observably active, or its state could not be confirmed. Needs an operator.
    Unrecoverable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRollback {
    pub service: ServiceId,
    pub outcome: RollbackOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStatus {
    Succeeded,
    PartiallyFailed,
    Unrecoverable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackResult {
    pub status: RollbackStatus,
    /// Teardown order.
    pub services: Vec<ServiceRollback>,
    /// `None` when there was no snapshot to restore.
    pub config_restored: Option<bool>,
    /// `None` when there was no infrastructure to release.
    pub infrastructure_released: Option<bool>,
    pub notes: Vec<String>,
}

impl RollbackResult {
    pub(crate) fn summarize(
        services: Vec<ServiceRollback>,
        config_restored: Option<bool>,
        infrastructure_released: Option<bool>,
        notes: Vec<String>,
    ) -> Self {
        let status = if services
            .iter()
            .any(|s| s.outcome == RollbackOutcome::Unrecoverable)
        {
            RollbackStatus::Unrecoverable
        } else if services.iter().any(|s| s.outcome == RollbackOutcome::Failed)
            || config_restored == Some(false)
            || infrastructure_released == Some(false)
        {
            RollbackStatus::PartiallyFailed
        } else {
            RollbackStatus::Succeeded
        };

        RollbackResult {
            status,
            services,
            config_restored,
            infrastructure_released,
            notes,
        }
    }

    pub fn order(&self) -> Vec<&ServiceId> {
        self.services.iter().map(|s| &s.service).collect()
    }

    pub fn outcome_of(&self, service: &ServiceId) -> Option<RollbackOutcome> {
        self.services
            .iter()
            .find(|s| &s.service == service)
            .map(|s| s.outcome)
    }

    pub fn is_success(&self) -> bool {
        self.status == RollbackStatus::Succeeded
    }

    /// Short human summary used for alerts.
    pub fn summary(&self) -> String {
        let failed = self
            .services
            .iter()
            .filter(|s| s.outcome != RollbackOutcome::Success)
            .count();
        format!(
            "rolled back {} service(s), {} not cleanly ({:?})",
            self.services.len(),
            failed,
            self.status
        )
    }
}
