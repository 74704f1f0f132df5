// ABOUTME: Deployment spec and environment configuration parsed from YAML.
// ABOUTME: Handles discovery, duration parsing, and non-empty service/stage lists.

mod deserialize;
mod env_value;
mod environment;
mod service;
mod settings;
mod stage;

pub use env_value::{EnvValue, resolve_env_map};
pub use environment::{EnvironmentConfig, Requirements};
pub use service::{PerformanceBaseline, ReadinessProbe, RetryConfig, ServiceConfig, ServiceKind};
pub use settings::{HealthSettings, PhaseTimeouts, RollbackSettings};
pub use stage::{ActivationOrder, FailureHandling, IntegrationTest, Stage, SuccessCriteria};

use crate::error::{Error, Result};
use deserialize::deserialize_non_empty;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::Path;

pub const SPEC_FILENAME: &str = "convoy.yml";
pub const SPEC_FILENAME_ALT: &str = "convoy.yaml";
pub const SPEC_FILENAME_DIR: &str = ".convoy/deployment.yml";

/// Everything needed to run one deployment, before rollback capabilities are attached.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentSpec {
    pub name: String,

    #[serde(deserialize_with = "deserialize_non_empty")]
    pub services: NonEmpty<ServiceConfig>,

    pub activation: ActivationOrder,

    #[serde(default)]
    pub failure_handling: FailureHandling,

    #[serde(default)]
    pub rollback: RollbackSettings,

    #[serde(default)]
    pub health: HealthSettings,

    #[serde(default)]
    pub timeouts: PhaseTimeouts,
}

impl DeploymentSpec {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(SPEC_FILENAME),
            dir.join(SPEC_FILENAME_ALT),
            dir.join(SPEC_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::SpecNotFound(dir.to_path_buf()))
    }
}
