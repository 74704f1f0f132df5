// ABOUTME: Stage and activation order definitions.
// ABOUTME: A stage groups services under one concurrency policy and validation window.

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use super::deserialize::deserialize_non_empty;
use crate::health::HealthStatus;
use crate::types::ServiceId;

#[derive(Debug, Clone, Deserialize)]
pub struct Stage {
    pub name: String,

    #[serde(deserialize_with = "deserialize_non_empty")]
    pub services: NonEmpty<ServiceId>,

    /// Services that must already be active before this stage starts.
    #[serde(default)]
    pub prerequisites: BTreeSet<ServiceId>,

    #[serde(default)]
    pub parallel: bool,

    #[serde(default = "default_stage_activation_timeout", with = "humantime_serde")]
    pub activation_timeout: Duration,

    #[serde(default = "default_validation_timeout", with = "humantime_serde")]
    pub validation_timeout: Duration,

    #[serde(default)]
    pub success_criteria: SuccessCriteria,

    /// Stage-level settings applied to every member during preparation.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

impl Stage {
    pub fn contains(&self, service: &ServiceId) -> bool {
        self.services.iter().any(|s| s == service)
    }

    /// Position of a member in the declared order.
    pub fn position(&self, service: &ServiceId) -> Option<usize> {
        self.services.iter().position(|s| s == service)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SuccessCriteria {
    #[serde(default = "default_allow_degraded")]
    pub allow_degraded: bool,
}

impl SuccessCriteria {
    pub fn accepts(&self, status: HealthStatus) -> bool {
        match status {
            HealthStatus::Healthy => true,
            HealthStatus::Degraded => self.allow_degraded,
            HealthStatus::Failed => false,
        }
    }
}

impl Default for SuccessCriteria {
    fn default() -> Self {
        SuccessCriteria {
            allow_degraded: default_allow_degraded(),
        }
    }
}

/// A cross-service check executed once every stage is active.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IntegrationTest {
    pub name: String,
    #[serde(default)]
    pub services: BTreeSet<ServiceId>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivationOrder {
    #[serde(deserialize_with = "deserialize_non_empty")]
    pub stages: NonEmpty<Stage>,

    #[serde(default)]
    pub integration_tests: Vec<IntegrationTest>,
}

impl ActivationOrder {
    /// Index of the stage that owns a service.
    pub fn stage_of(&self, service: &ServiceId) -> Option<usize> {
        self.stages.iter().position(|stage| stage.contains(service))
    }

    pub fn all_services(&self) -> BTreeSet<ServiceId> {
        self.stages
            .iter()
            .flat_map(|stage| stage.services.iter().cloned())
            .collect()
    }
}

/// How much previously activated work to undo when a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureHandling {
    /// Failed stage plus every earlier stage.
    #[default]
    RollbackAll,
    /// Only the partially activated services of the failed stage.
    RollbackFailedStage,
    /// Failed stage plus the given number of stages immediately before it.
    RollbackRecentStages { stages: usize },
}

fn default_stage_activation_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_validation_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_allow_degraded() -> bool {
    true
}
