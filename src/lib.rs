// ABOUTME: Library root for convoy - staged deployment orchestration with rollback.
// ABOUTME: Exposes the orchestrator, its configuration and collaborator contracts.

pub mod activation;
pub mod collaborators;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod health;
pub mod hooks;
pub mod logging;
pub mod plan;
pub mod readiness;
pub mod report;
pub mod rollback;
pub mod runtime;
pub mod types;

pub use deploy::{DeploymentOrchestrator, DeploymentResult, DeploymentStatus};
pub use error::{Error, Result};
