// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Rejects empty lists where at least one entry is required.

use nonempty::NonEmpty;
use serde::{Deserialize, Deserializer};

pub fn deserialize_non_empty<'de, D, T>(deserializer: D) -> Result<NonEmpty<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let values: Vec<T> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(values)
        .ok_or_else(|| serde::de::Error::custom("at least one entry is required"))
}
