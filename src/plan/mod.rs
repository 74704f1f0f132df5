// ABOUTME: Deployment plan: services with rollback capabilities plus the activation order.
// ABOUTME: Assembly checks the deployment spec's structure before any deployment work starts.

mod procedures;
mod service;

pub use procedures::{RollbackProcedure, RollbackProcedures};
pub use service::ServiceSpec;

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::{
    ActivationOrder, DeploymentSpec, FailureHandling, HealthSettings, PhaseTimeouts,
    RollbackSettings,
};
use crate::error::{Error, Result};
use crate::types::ServiceId;

/// A validated, ready-to-run deployment.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    pub name: String,
    pub services: Vec<ServiceSpec>,
    pub order: ActivationOrder,
    pub failure_handling: FailureHandling,
    pub rollback: RollbackSettings,
    pub health: HealthSettings,
    pub timeouts: PhaseTimeouts,
}

impl DeploymentPlan {
    /// Check the deployment spec's structure and attach a rollback procedure to every service.
    ///
    /// A stage prerequisite must be a member of an earlier stage; otherwise it
    /// could never be active when the stage starts.
    ///
    /// Dependency problems (cycles, dangling ids, stage ordering) are left to
    /// the dependency graph so they surface as validation failures of the
    /// deployment itself.
    pub fn assemble(spec: DeploymentSpec, procedures: &RollbackProcedures) -> Result<Self> {
        let mut declared = HashSet::new();
        for service in spec.services.iter() {
            if !declared.insert(service.id.clone()) {
                return Err(Error::InvalidConfig(format!(
                    "service {} is declared more than once",
                    service.id
                )));
            }
        }

        let mut owner: HashMap<&ServiceId, &str> = HashMap::new();
        let mut stage_names = HashSet::new();
        for stage in spec.activation.stages.iter() {
            if !stage_names.insert(stage.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "stage {} is declared more than once",
                    stage.name
                )));
            }

            for member in stage.services.iter() {
                if !declared.contains(member) {
                    return Err(Error::InvalidConfig(format!(
                        "stage {} references undeclared service {}",
                        stage.name, member
                    )));
                }
                if let Some(previous) = owner.insert(member, &stage.name) {
                    return Err(Error::InvalidConfig(format!(
                        "service {} appears in both stage {} and stage {}",
                        member, previous, stage.name
                    )));
                }
            }

            for prerequisite in stage.prerequisites.iter() {
                if !declared.contains(prerequisite) {
                    return Err(Error::InvalidConfig(format!(
                        "stage {} requires undeclared service {}",
                        stage.name, prerequisite
                    )));
                }
                // `owner` only holds members of this stage and earlier ones.
                match owner.get(prerequisite) {
                    Some(&earlier) if earlier != stage.name => {}
                    _ => {
                        return Err(Error::InvalidConfig(format!(
                            "stage {} requires {}, which no earlier stage activates",
                            stage.name, prerequisite
                        )));
                    }
                }
            }
        }

        if let Some(unstaged) = spec.services.iter().find(|s| !owner.contains_key(&s.id)) {
            return Err(Error::InvalidConfig(format!(
                "service {} is not assigned to any stage",
                unstaged.id
            )));
        }

        let services = spec
            .services
            .into_iter()
            .map(|config| {
                let procedure = procedures.resolve(&config).ok_or_else(|| {
                    Error::MissingRollbackProcedure {
                        service: config.id.clone(),
                        kind: config.kind,
                    }
                })?;
                Ok(ServiceSpec::new(config, procedure))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DeploymentPlan {
            name: spec.name,
            services,
            order: spec.activation,
            failure_handling: spec.failure_handling,
            rollback: spec.rollback,
            health: spec.health,
            timeouts: spec.timeouts,
        })
    }

    pub fn service(&self, id: &ServiceId) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| &s.id == id)
    }

    pub fn service_ids(&self) -> BTreeSet<ServiceId> {
        self.services.iter().map(|s| s.id.clone()).collect()
    }

    /// Resolve the declared dependencies of a service to their specs.
    pub fn dependencies_of(&self, service: &ServiceSpec) -> Vec<&ServiceSpec> {
        service
            .dependencies
            .iter()
            .filter_map(|id| self.service(id))
            .collect()
    }
}
