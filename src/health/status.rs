// ABOUTME: Health classification for a single service and the per-tier probe record.
// ABOUTME: Worst status wins: Failed over Degraded over Healthy.

use serde::Serialize;
use std::fmt;

use crate::types::ServiceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Degraded,
    Failed,
}

impl HealthStatus {
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        self.max(other)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The four probe tiers, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthTier {
    Endpoint,
    Dependencies,
    Readiness,
    Performance,
}

impl HealthTier {
    /// Status a service drops to when a check in this tier does not pass.
    pub fn penalty(self) -> HealthStatus {
        match self {
            HealthTier::Endpoint | HealthTier::Readiness => HealthStatus::Failed,
            HealthTier::Dependencies | HealthTier::Performance => HealthStatus::Degraded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Passed,
    Failed(String),
    TimedOut,
}

impl ProbeOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, ProbeOutcome::Passed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierCheck {
    pub tier: HealthTier,
    /// Probe, dependency or metric name.
    pub name: String,
    pub outcome: ProbeOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub service: ServiceId,
    pub status: HealthStatus,
    pub checks: Vec<TierCheck>,
}

impl HealthReport {
    pub(crate) fn from_checks(service: ServiceId, checks: Vec<TierCheck>) -> Self {
        let status = checks
            .iter()
            .filter(|check| !check.outcome.passed())
            .fold(HealthStatus::Healthy, |status, check| {
                status.worst(check.tier.penalty())
            });
        HealthReport {
            service,
            status,
            checks,
        }
    }

    /// Stand-in report for a service whose validation did not finish in time.
    pub fn timed_out(service: ServiceId) -> Self {
        HealthReport {
            service,
            status: HealthStatus::Failed,
            checks: vec![TierCheck {
                tier: HealthTier::Endpoint,
                name: "stage validation".to_string(),
                outcome: ProbeOutcome::TimedOut,
            }],
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &TierCheck> {
        self.checks.iter().filter(|check| !check.outcome.passed())
    }
}
