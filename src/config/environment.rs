// ABOUTME: Target environment description consumed by validation and preparation.
// ABOUTME: Requirements, resource allocations, base config path, and overrides.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::env_value::{EnvValue, resolve_env_map};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,

    #[serde(default)]
    pub requirements: Requirements,

    #[serde(default)]
    pub resources: BTreeMap<String, String>,

    #[serde(default)]
    pub base_config_path: Option<PathBuf>,

    #[serde(default)]
    pub overrides: HashMap<String, EnvValue>,
}

/// Prerequisites checked by the environment validation collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Requirements {
    #[serde(default)]
    pub hardware: BTreeMap<String, String>,
    #[serde(default)]
    pub software: BTreeMap<String, String>,
    #[serde(default)]
    pub network: BTreeMap<String, String>,
    #[serde(default)]
    pub security: BTreeMap<String, String>,
}

impl EnvironmentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        EnvironmentConfig {
            name: name.into(),
            requirements: Requirements::default(),
            resources: BTreeMap::new(),
            base_config_path: None,
            overrides: HashMap::new(),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Resolve environment overrides against the process environment.
    pub fn resolved_overrides(&self) -> Result<BTreeMap<String, String>> {
        resolve_env_map(&self.overrides)
    }
}
