// ABOUTME: Phantom-typed identifiers for deployment attempts and config snapshots.
// ABOUTME: Generated ids carry a kind prefix, a UTC timestamp, and a random suffix.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use uuid::Uuid;

/// What an [`Id`] identifies. Implemented by uninhabited marker enums.
pub trait IdKind {
    const PREFIX: &'static str;
}

pub enum DeploymentMarker {}
pub enum SnapshotMarker {}

impl IdKind for DeploymentMarker {
    const PREFIX: &'static str = "deploy";
}

impl IdKind for SnapshotMarker {
    const PREFIX: &'static str = "snap";
}

/// Identifier that cannot be confused with an identifier of another kind.
#[must_use = "ids name deployment records and should not be discarded"]
pub struct Id<K> {
    value: String,
    kind: PhantomData<K>,
}

impl<K> Id<K> {
    pub fn new(value: impl Into<String>) -> Self {
        Id {
            value: value.into(),
            kind: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

impl<K: IdKind> Id<K> {
    /// `<prefix>_<YYYYmmdd_HHMMSS>_<8 hex>`
    pub fn generate() -> Self {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        Id::new(format!("{}_{stamp}_{}", K::PREFIX, &suffix[..8]))
    }
}

// The marker is never stored, so none of these need bounds on K.

impl<K> fmt::Debug for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.value).finish()
    }
}

impl<K> fmt::Display for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<K> Clone for Id<K> {
    fn clone(&self) -> Self {
        Id::new(self.value.clone())
    }
}

impl<K> PartialEq for Id<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K> Eq for Id<K> {}

impl<K> Hash for Id<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<K> Serialize for Id<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, K> Deserialize<'de> for Id<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Id::new)
    }
}

pub type DeploymentId = Id<DeploymentMarker>;
pub type SnapshotId = Id<SnapshotMarker>;
