// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to keep deployment and snapshot ids apart.

mod id;
mod service_id;

pub use id::{DeploymentId, Id, IdKind, SnapshotId};
pub use service_id::{ServiceId, ServiceIdError};
