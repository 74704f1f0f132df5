// ABOUTME: Declarative service entries as written in the deployment spec.
// ABOUTME: Covers dependencies, health endpoint, readiness probes, baselines, and retries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use crate::types::ServiceId;

/// Broad category of a service, used to pick its rollback procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Database,
    Container,
    Network,
    #[default]
    Generic,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceKind::Database => "database",
            ServiceKind::Container => "container",
            ServiceKind::Network => "network",
            ServiceKind::Generic => "generic",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub id: ServiceId,

    #[serde(default)]
    pub kind: ServiceKind,

    #[serde(default)]
    pub dependencies: BTreeSet<ServiceId>,

    pub health_endpoint: String,

    #[serde(default)]
    pub readiness_probes: Vec<ReadinessProbe>,

    #[serde(default)]
    pub performance_baselines: Vec<PerformanceBaseline>,

    #[serde(default = "default_activation_timeout", with = "humantime_serde")]
    pub activation_timeout: Duration,

    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReadinessProbe {
    pub name: String,
    #[serde(default)]
    pub target: Option<String>,
}

/// Accepted range for one runtime metric. Either bound may be omitted.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PerformanceBaseline {
    pub metric: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl PerformanceBaseline {
    pub fn accepts(&self, sample: f64) -> bool {
        self.min.is_none_or(|min| sample >= min) && self.max.is_none_or(|max| sample <= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub delay: Duration,
}

impl RetryConfig {
    /// Total activation tries; zero is treated as a single try.
    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            attempts: default_attempts(),
            delay: default_retry_delay(),
        }
    }
}

fn default_activation_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_attempts() -> u32 {
    1
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(2)
}
