// ABOUTME: Per-environment configuration override values.
// ABOUTME: An override is a literal or a reference to a process environment variable.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Value of a single configuration override.
///
/// ```yaml
/// overrides:
///   replicas: "4"
///   db_password: { env: SHOP_DB_PASSWORD }
///   log_level: { env: SHOP_LOG_LEVEL, default: info }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    /// Resolve the value for the override named `key`.
    pub fn resolve_for(&self, key: &str) -> Result<String> {
        let (var, default) = match self {
            EnvValue::Literal(value) => return Ok(value.clone()),
            EnvValue::FromEnv { var, default } => (var, default),
        };

        if let Ok(value) = std::env::var(var) {
            return Ok(value);
        }
        default.clone().ok_or_else(|| Error::MissingOverrideVar {
            key: key.to_string(),
            var: var.clone(),
        })
    }
}

/// Resolve every override. The first unresolvable key aborts resolution.
pub fn resolve_env_map(overrides: &HashMap<String, EnvValue>) -> Result<BTreeMap<String, String>> {
    let mut resolved = BTreeMap::new();
    for (key, value) in overrides {
        resolved.insert(key.clone(), value.resolve_for(key)?);
    }
    Ok(resolved)
}
