// ABOUTME: Drives stage execution in declared order, then the integration tests.
// ABOUTME: Stops at the first failing stage and rolls back according to the failure policy.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::outcome::{ActivationError, StageResult};
use super::stage::StageExecutor;
use crate::collaborators::{
    ConfigSnapshot, IntegrationTestResult, IntegrationTester, ProvisionedResources,
};
use crate::config::FailureHandling;
use crate::graph::DependencyGraph;
use crate::plan::DeploymentPlan;
use crate::rollback::{RollbackManager, RollbackRequest, RollbackResult};
use crate::types::ServiceId;

/// Inputs shared by every stage of one attempt.
#[derive(Debug, Clone, Copy)]
pub struct SequenceContext<'a> {
    pub plan: &'a DeploymentPlan,
    pub graph: &'a DependencyGraph,
    pub snapshot: Option<&'a ConfigSnapshot>,
    pub infrastructure: Option<&'a ProvisionedResources>,
}

#[derive(Debug, Clone)]
pub struct SequenceOutcome {
    pub stage_results: Vec<StageResult>,
    pub activated: BTreeSet<ServiceId>,
    pub failed: BTreeSet<ServiceId>,
    pub integration: Option<IntegrationTestResult>,
    pub error: Option<ActivationError>,
    pub rollback: Option<RollbackResult>,
}

impl SequenceOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub struct ActivationSequencer {
    executor: StageExecutor,
    integration: Arc<dyn IntegrationTester>,
    rollback: Arc<RollbackManager>,
}

impl ActivationSequencer {
    pub fn new(
        executor: StageExecutor,
        integration: Arc<dyn IntegrationTester>,
        rollback: Arc<RollbackManager>,
    ) -> Self {
        ActivationSequencer {
            executor,
            integration,
            rollback,
        }
    }

    pub async fn run(&self, ctx: SequenceContext<'_>) -> SequenceOutcome {
        let plan = ctx.plan;
        let mut outcome = SequenceOutcome {
            stage_results: Vec::with_capacity(plan.order.stages.len()),
            activated: BTreeSet::new(),
            failed: BTreeSet::new(),
            integration: None,
            error: None,
            rollback: None,
        };

        for stage in plan.order.stages.iter() {
            let result = self.executor.execute(stage, plan, &outcome.activated).await;
            outcome.activated.extend(result.activated_services());
            outcome.failed.extend(result.failed_services());

            let failure = result.failure.clone();
            outcome.stage_results.push(result);
            if let Some(failure) = failure {
                tracing::error!(stage = %stage.name, %failure, "stage failed, halting activation");
                outcome.error = Some(ActivationError::StageFailed {
                    stage: stage.name.clone(),
                    failure,
                });
                break;
            }
        }

        if outcome.error.is_none() {
            self.run_integration_tests(plan, &mut outcome).await;
        }

        if outcome.error.is_some() {
            if plan.rollback.enabled {
                outcome.rollback = Some(self.roll_back(ctx, &outcome).await);
            } else {
                tracing::warn!("automatic rollback disabled, leaving services in place");
            }
        }

        outcome
    }

    async fn run_integration_tests(&self, plan: &DeploymentPlan, outcome: &mut SequenceOutcome) {
        let tests = &plan.order.integration_tests;
        if tests.is_empty() {
            return;
        }

        tracing::info!(count = tests.len(), "running integration tests");
        let limit = plan.timeouts.integration;
        let run = self
            .integration
            .execute_integration_tests(tests, &outcome.activated);

        outcome.error = match tokio::time::timeout(limit, run).await {
            Ok(Ok(result)) => {
                let error = (!result.is_success()).then(|| ActivationError::IntegrationFailed {
                    failures: result.failures.clone(),
                });
                outcome.integration = Some(result);
                error
            }
            Ok(Err(e)) => Some(ActivationError::IntegrationFailed {
                failures: vec![e.to_string()],
            }),
            Err(_) => Some(ActivationError::IntegrationTimeout(limit)),
        };

        if let Some(error) = &outcome.error {
            tracing::error!(%error, "integration tests failed");
        }
    }

    async fn roll_back(&self, ctx: SequenceContext<'_>, outcome: &SequenceOutcome) -> RollbackResult {
        let targets = rollback_scope(ctx.plan.failure_handling, &outcome.stage_results);
        let infrastructure = if outcome.activated.is_subset(&targets) {
            ctx.infrastructure
        } else {
            None
        };

        self.rollback
            .rollback(
                ctx.plan,
                ctx.graph,
                RollbackRequest {
                    targets,
                    snapshot: ctx.snapshot,
                    infrastructure,
                },
            )
            .await
    }
}

/// Services to undo: everything attempted in the failed stage plus the
/// earlier stages the policy reaches back to.
///
/// The failed stage is the last one executed; for an integration failure
/// that is the final stage.
pub fn rollback_scope(policy: FailureHandling, stage_results: &[StageResult]) -> BTreeSet<ServiceId> {
    let Some(failed) = stage_results.len().checked_sub(1) else {
        return BTreeSet::new();
    };
    let first = match policy {
        FailureHandling::RollbackAll => 0,
        FailureHandling::RollbackFailedStage => failed,
        FailureHandling::RollbackRecentStages { stages } => failed.saturating_sub(stages),
    };

    stage_results[first..=failed]
        .iter()
        .flat_map(StageResult::attempted_services)
        .collect()
}
