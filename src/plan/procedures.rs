// ABOUTME: Rollback capability attached to each service, and the registry that assigns it.
// ABOUTME: Procedures are chosen per service id first, then per service kind.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::ServiceSpec;
use crate::config::{ServiceConfig, ServiceKind};
use crate::runtime::ProcedureError;
use crate::types::ServiceId;

/// Reverses the activation of one service.
#[async_trait]
pub trait RollbackProcedure: Send + Sync {
    async fn execute(&self, service: &ServiceSpec) -> Result<(), ProcedureError>;
}

/// Maps services to the procedure that can undo them.
#[derive(Clone, Default)]
pub struct RollbackProcedures {
    by_kind: HashMap<ServiceKind, Arc<dyn RollbackProcedure>>,
    by_service: HashMap<ServiceId, Arc<dyn RollbackProcedure>>,
}

impl RollbackProcedures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `procedure` for every service of `kind` without a per-service override.
    pub fn for_kind(mut self, kind: ServiceKind, procedure: Arc<dyn RollbackProcedure>) -> Self {
        self.by_kind.insert(kind, procedure);
        self
    }

    /// Use `procedure` for one specific service.
    pub fn for_service(mut self, service: ServiceId, procedure: Arc<dyn RollbackProcedure>) -> Self {
        self.by_service.insert(service, procedure);
        self
    }

    pub fn resolve(&self, service: &ServiceConfig) -> Option<Arc<dyn RollbackProcedure>> {
        self.by_service
            .get(&service.id)
            .or_else(|| self.by_kind.get(&service.kind))
            .cloned()
    }
}

impl std::fmt::Debug for RollbackProcedures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollbackProcedures")
            .field("kinds", &self.by_kind.keys().collect::<Vec<_>>())
            .field("services", &self.by_service.keys().collect::<Vec<_>>())
            .finish()
    }
}
