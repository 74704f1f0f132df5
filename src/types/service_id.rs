// ABOUTME: Validated service identifier used as graph node and map key.
// ABOUTME: Lowercase alphanumeric with hyphens or underscores, at most 63 characters.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceIdError {
    #[error("service id cannot be empty")]
    Empty,

    #[error("service id exceeds maximum length of 63 characters")]
    TooLong,

    #[error("service id must start with a lowercase letter or digit")]
    InvalidStart,

    #[error("service id must be lowercase")]
    NotLowercase,

    #[error("invalid character in service id: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(value: &str) -> Result<Self, ServiceIdError> {
        if value.is_empty() {
            return Err(ServiceIdError::Empty);
        }

        if value.len() > 63 {
            return Err(ServiceIdError::TooLong);
        }

        if value.starts_with(['-', '_']) {
            return Err(ServiceIdError::InvalidStart);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(ServiceIdError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '_' {
                return Err(ServiceIdError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ServiceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServiceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ServiceId::new(&s).map_err(serde::de::Error::custom)
    }
}
