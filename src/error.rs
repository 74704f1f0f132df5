// ABOUTME: Errors raised while loading deployment specs and assembling plans.
// ABOUTME: Deployment failures are values in DeploymentResult, not these errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ServiceKind;
use crate::types::ServiceId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no deployment spec (convoy.yml, convoy.yaml, .convoy/deployment.yml) in {0}")]
    SpecNotFound(PathBuf),

    #[error("override {key} needs environment variable {var}, which is not set")]
    MissingOverrideVar { key: String, var: String },

    #[error("invalid deployment spec: {0}")]
    InvalidConfig(String),

    #[error("no rollback procedure registered for service {service} ({kind})")]
    MissingRollbackProcedure { service: ServiceId, kind: ServiceKind },

    #[error("reading configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing configuration YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
