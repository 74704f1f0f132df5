// ABOUTME: Tunable timeouts and rollback behaviour for one deployment.
// ABOUTME: Every collaborator call and health tier gets an explicit deadline.

use serde::Deserialize;
use std::time::Duration;

/// Per-tier deadlines for the health probe sequence.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HealthSettings {
    #[serde(default = "default_endpoint_timeout", with = "humantime_serde")]
    pub endpoint_timeout: Duration,

    #[serde(default = "default_dependency_timeout", with = "humantime_serde")]
    pub dependency_timeout: Duration,

    #[serde(default = "default_readiness_timeout", with = "humantime_serde")]
    pub readiness_timeout: Duration,

    #[serde(default = "default_performance_timeout", with = "humantime_serde")]
    pub performance_timeout: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        HealthSettings {
            endpoint_timeout: default_endpoint_timeout(),
            dependency_timeout: default_dependency_timeout(),
            readiness_timeout: default_readiness_timeout(),
            performance_timeout: default_performance_timeout(),
        }
    }
}

/// Deadlines for the collaborator calls made by each phase.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PhaseTimeouts {
    #[serde(default = "default_validation", with = "humantime_serde")]
    pub validation: Duration,

    #[serde(default = "default_preparation", with = "humantime_serde")]
    pub preparation: Duration,

    #[serde(default = "default_integration", with = "humantime_serde")]
    pub integration: Duration,

    #[serde(default = "default_readiness", with = "humantime_serde")]
    pub readiness: Duration,

    #[serde(default = "default_monitoring", with = "humantime_serde")]
    pub monitoring: Duration,

    /// Deadline for the emergency hook after an unexpected fault.
    #[serde(default = "default_emergency", with = "humantime_serde")]
    pub emergency: Duration,
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        PhaseTimeouts {
            validation: default_validation(),
            preparation: default_preparation(),
            integration: default_integration(),
            readiness: default_readiness(),
            monitoring: default_monitoring(),
            emergency: default_emergency(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RollbackSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_procedure_timeout", with = "humantime_serde")]
    pub procedure_timeout: Duration,

    /// Deadline for confirming a service is no longer active.
    #[serde(default = "default_verify_timeout", with = "humantime_serde")]
    pub verify_timeout: Duration,
}

impl Default for RollbackSettings {
    fn default() -> Self {
        RollbackSettings {
            enabled: default_enabled(),
            procedure_timeout: default_procedure_timeout(),
            verify_timeout: default_verify_timeout(),
        }
    }
}

fn default_endpoint_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_dependency_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_readiness_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_performance_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_validation() -> Duration {
    Duration::from_secs(60)
}

fn default_preparation() -> Duration {
    Duration::from_secs(300)
}

fn default_integration() -> Duration {
    Duration::from_secs(300)
}

fn default_readiness() -> Duration {
    Duration::from_secs(120)
}

fn default_monitoring() -> Duration {
    Duration::from_secs(30)
}

fn default_emergency() -> Duration {
    Duration::from_secs(60)
}

fn default_enabled() -> bool {
    true
}

fn default_procedure_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_verify_timeout() -> Duration {
    Duration::from_secs(10)
}
