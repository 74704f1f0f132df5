// ABOUTME: In-process configuration manager holding the live configuration in memory.
// ABOUTME: Snapshots copy the live map; restore replaces it wholesale.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

use super::traits::ConfigurationManager;
use super::types::{CollaboratorError, ConfigSnapshot, MergedConfig};
use crate::config::EnvironmentConfig;
use crate::types::ServiceId;

/// Configuration manager for embedders without an external config store.
#[derive(Debug, Default)]
pub struct InMemoryConfiguration {
    base: BTreeMap<String, String>,
    live: RwLock<BTreeMap<String, String>>,
}

impl InMemoryConfiguration {
    /// `base` is both the starting live configuration and the merge base.
    pub fn new(base: BTreeMap<String, String>) -> Self {
        InMemoryConfiguration {
            live: RwLock::new(base.clone()),
            base,
        }
    }

    pub fn live(&self) -> BTreeMap<String, String> {
        self.live.read().clone()
    }
}

#[async_trait]
impl ConfigurationManager for InMemoryConfiguration {
    async fn snapshot(&self, _env: &EnvironmentConfig) -> Result<ConfigSnapshot, CollaboratorError> {
        Ok(ConfigSnapshot::capture(self.live()))
    }

    async fn load_merge_validate(
        &self,
        _env: &EnvironmentConfig,
        overrides: &BTreeMap<String, String>,
    ) -> Result<MergedConfig, CollaboratorError> {
        if let Some(key) = overrides.keys().find(|key| key.trim().is_empty()) {
            return Err(CollaboratorError::Failed(format!(
                "invalid configuration key {key:?}"
            )));
        }

        let mut values = self.base.clone();
        values.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(MergedConfig { values })
    }

    async fn distribute(
        &self,
        config: &MergedConfig,
        _services: &BTreeSet<ServiceId>,
    ) -> Result<(), CollaboratorError> {
        *self.live.write() = config.values.clone();
        Ok(())
    }

    async fn restore(&self, snapshot: &ConfigSnapshot) -> Result<(), CollaboratorError> {
        *self.live.write() = snapshot.values().clone();
        Ok(())
    }
}
