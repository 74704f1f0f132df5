// ABOUTME: Capability traits for running and probing services.
// ABOUTME: Exports the runtime, probe, and their error types.

mod error;
mod probe;
mod service;

pub use error::{ProbeError, ProcedureError, ServiceError};
pub use probe::HealthProbe;
pub use service::ServiceRuntime;
