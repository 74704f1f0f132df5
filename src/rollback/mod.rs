// ABOUTME: Rollback manager: isolates, tears down, restores config and verifies targets.
// ABOUTME: Keeps a ledger so repeating a rollback on the same targets is a no-op.

mod result;

pub use result::{RollbackOutcome, RollbackResult, RollbackStatus, ServiceRollback};

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::collaborators::{
    ConfigSnapshot, ConfigurationManager, ProvisionedResources, ResourceProvisioner,
};
use crate::config::RollbackSettings;
use crate::graph::DependencyGraph;
use crate::plan::DeploymentPlan;
use crate::runtime::ServiceRuntime;
use crate::types::{ServiceId, SnapshotId};

/// What to undo.
#[derive(Debug, Clone, Default)]
pub struct RollbackRequest<'a> {
    pub targets: BTreeSet<ServiceId>,
    pub snapshot: Option<&'a ConfigSnapshot>,
    pub infrastructure: Option<&'a ProvisionedResources>,
}

#[derive(Debug, Default)]
struct Ledger {
    rolled_back: BTreeSet<ServiceId>,
    restored: HashSet<SnapshotId>,
    released: bool,
}

pub struct RollbackManager {
    runtime: Arc<dyn ServiceRuntime>,
    configuration: Arc<dyn ConfigurationManager>,
    provisioner: Arc<dyn ResourceProvisioner>,
    settings: RollbackSettings,
    ledger: Mutex<Ledger>,
}

impl RollbackManager {
    pub fn new(
        runtime: Arc<dyn ServiceRuntime>,
        configuration: Arc<dyn ConfigurationManager>,
        provisioner: Arc<dyn ResourceProvisioner>,
        settings: RollbackSettings,
    ) -> Self {
        RollbackManager {
            runtime,
            configuration,
            provisioner,
            settings,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Undo `request.targets`, dependents before their dependencies.
    ///
    /// Every target gets an attempt; failures are recorded per service and
    /// never stop the run. Targets already rolled back by this manager are
    /// reported as successful without touching them again.
    pub async fn rollback(
        &self,
        plan: &DeploymentPlan,
        graph: &DependencyGraph,
        request: RollbackRequest<'_>,
    ) -> RollbackResult {
        let order = graph.teardown_order(&request.targets);
        let done = self.ledger.lock().rolled_back.clone();
        let pending: Vec<&ServiceId> = order.iter().filter(|id| !done.contains(*id)).collect();
        let mut notes = Vec::new();

        tracing::info!(
            deployment = %plan.name,
            order = ?order.iter().map(ServiceId::as_str).collect::<Vec<_>>(),
            "rolling back services"
        );

        for id in &pending {
            match tokio::time::timeout(self.settings.procedure_timeout, self.runtime.isolate(id))
                .await
            {
                Ok(Ok(())) => tracing::debug!(service = %id, "isolated"),
                Ok(Err(e)) => notes.push(format!("isolating {id}: {e}")),
                Err(_) => notes.push(format!("isolating {id}: timed out")),
            }
        }

        let mut services = Vec::with_capacity(order.len());
        for id in &order {
            if done.contains(id) {
                services.push(ServiceRollback {
                    service: id.clone(),
                    outcome: RollbackOutcome::Success,
                    detail: Some("already rolled back".to_string()),
                });
                continue;
            }
            services.push(self.run_procedure(plan, id).await);
        }

        let config_restored = match request.snapshot {
            Some(snapshot) => Some(self.restore(snapshot, &mut notes).await),
            None => None,
        };

        for entry in services.iter_mut().filter(|e| !done.contains(&e.service)) {
            self.verify(entry).await;
            if entry.outcome == RollbackOutcome::Success {
                self.ledger.lock().rolled_back.insert(entry.service.clone());
            }
        }

        let infrastructure_released = match request.infrastructure {
            Some(resources) => Some(self.release(resources, &mut notes).await),
            None => None,
        };

        let result =
            RollbackResult::summarize(services, config_restored, infrastructure_released, notes);
        tracing::info!(status = ?result.status, "rollback finished");
        result
    }

    /// Reclaim preparation side effects when nothing was activated.
    pub async fn cleanup(
        &self,
        snapshot: Option<&ConfigSnapshot>,
        infrastructure: Option<&ProvisionedResources>,
    ) -> RollbackResult {
        tracing::info!("cleaning up after failed preparation");
        let mut notes = Vec::new();

        let config_restored = match snapshot {
            Some(snapshot) => Some(self.restore(snapshot, &mut notes).await),
            None => None,
        };
        let infrastructure_released = match infrastructure {
            Some(resources) => Some(self.release(resources, &mut notes).await),
            None => None,
        };

        RollbackResult::summarize(Vec::new(), config_restored, infrastructure_released, notes)
    }

    async fn run_procedure(&self, plan: &DeploymentPlan, id: &ServiceId) -> ServiceRollback {
        let Some(spec) = plan.service(id) else {
            return ServiceRollback {
                service: id.clone(),
                outcome: RollbackOutcome::Failed,
                detail: Some("service is not part of the plan".to_string()),
            };
        };

        let (outcome, detail) = match tokio::time::timeout(
            self.settings.procedure_timeout,
            spec.rollback_procedure.execute(spec),
        )
        .await
        {
            Ok(Ok(())) => (RollbackOutcome::Success, None),
            Ok(Err(e)) => {
                tracing::warn!(service = %id, error = %e, "rollback procedure failed");
                (RollbackOutcome::Failed, Some(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(service = %id, "rollback procedure timed out");
                (
                    RollbackOutcome::Failed,
                    Some(format!(
                        "timed out after {:?}",
                        self.settings.procedure_timeout
                    )),
                )
            }
        };

        ServiceRollback {
            service: id.clone(),
            outcome,
            detail,
        }
    }

    /// Downgrade an entry to unrecoverable if the service may still be running.
    async fn verify(&self, entry: &mut ServiceRollback) {
        let check =
            tokio::time::timeout(self.settings.verify_timeout, self.runtime.is_active(&entry.service))
                .await;

        let problem = match check {
            Ok(Ok(false)) => return,
            Ok(Ok(true)) => "still active after rollback".to_string(),
            Ok(Err(e)) => format!("could not confirm shutdown: {e}"),
            Err(_) => "could not confirm shutdown: timed out".to_string(),
        };

        tracing::error!(service = %entry.service, "{problem}; manual intervention required");
        entry.outcome = RollbackOutcome::Unrecoverable;
        entry.detail = Some(problem);
    }

    async fn restore(&self, snapshot: &ConfigSnapshot, notes: &mut Vec<String>) -> bool {
        if self.ledger.lock().restored.contains(snapshot.id()) {
            return true;
        }

        match tokio::time::timeout(
            self.settings.procedure_timeout,
            self.configuration.restore(snapshot),
        )
        .await
        {
            Ok(Ok(())) => {
                self.ledger.lock().restored.insert(snapshot.id().clone());
                tracing::debug!(snapshot = %snapshot.id(), "configuration restored");
                true
            }
            Ok(Err(e)) => {
                notes.push(format!("restoring configuration: {e}"));
                false
            }
            Err(_) => {
                notes.push("restoring configuration: timed out".to_string());
                false
            }
        }
    }

    async fn release(&self, resources: &ProvisionedResources, notes: &mut Vec<String>) -> bool {
        if self.ledger.lock().released {
            return true;
        }

        match tokio::time::timeout(
            self.settings.procedure_timeout,
            self.provisioner.release(resources),
        )
        .await
        {
            Ok(Ok(())) => {
                self.ledger.lock().released = true;
                true
            }
            Ok(Err(e)) => {
                notes.push(format!("releasing infrastructure: {e}"));
                false
            }
            Err(_) => {
                notes.push("releasing infrastructure: timed out".to_string());
                false
            }
        }
    }
}
