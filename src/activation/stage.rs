// ABOUTME: Activates one stage: prerequisites, preparation, activation, then health validation.
// ABOUTME: Parallel stages wait for every member; sequential stages stop at the first failure.

use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::outcome::{ActivationOutcome, ServiceOutcome, StageFailure, StageResult};
use crate::config::Stage;
use crate::health::{HealthReport, HealthValidator};
use crate::plan::{DeploymentPlan, ServiceSpec};
use crate::runtime::ServiceRuntime;
use crate::types::ServiceId;

pub struct StageExecutor {
    runtime: Arc<dyn ServiceRuntime>,
    validator: Arc<HealthValidator>,
}

impl StageExecutor {
    pub fn new(runtime: Arc<dyn ServiceRuntime>, validator: Arc<HealthValidator>) -> Self {
        StageExecutor { runtime, validator }
    }

    /// Activate `stage` given the services already active before it.
    pub async fn execute(
        &self,
        stage: &Stage,
        plan: &DeploymentPlan,
        activated: &BTreeSet<ServiceId>,
    ) -> StageResult {
        tracing::info!(stage = %stage.name, parallel = stage.parallel, "activating stage");
        let untouched = || {
            stage
                .services
                .iter()
                .cloned()
                .map(ServiceOutcome::skipped)
                .collect::<Vec<_>>()
        };

        let missing: Vec<ServiceId> = stage.prerequisites.difference(activated).cloned().collect();
        if !missing.is_empty() {
            tracing::warn!(stage = %stage.name, ?missing, "stage prerequisites not active");
            return StageResult::failed(
                &stage.name,
                untouched(),
                StageFailure::StagePrerequisiteUnmet {
                    stage: stage.name.clone(),
                    missing,
                },
            );
        }

        let mut specs = Vec::with_capacity(stage.services.len());
        for id in stage.services.iter() {
            let prepared = match plan.service(id) {
                Some(spec) => self.prepare(stage, spec).await.map(|()| spec.clone()),
                None => Err("service is not part of the plan".to_string()),
            };
            match prepared {
                Ok(spec) => specs.push(spec),
                Err(reason) => {
                    tracing::warn!(stage = %stage.name, service = %id, %reason, "preparation failed");
                    return StageResult::failed(
                        &stage.name,
                        untouched(),
                        StageFailure::PreparationFailed {
                            service: id.clone(),
                            reason,
                        },
                    );
                }
            }
        }

        let mut outcomes = if stage.parallel {
            self.activate_parallel(stage, specs.clone()).await
        } else {
            self.activate_sequential(stage, &specs).await
        };

        let failed: Vec<ServiceId> = outcomes
            .iter()
            .filter(|o| o.is_failure())
            .map(|o| o.service.clone())
            .collect();
        if !failed.is_empty() {
            return StageResult::failed(
                &stage.name,
                outcomes,
                StageFailure::ActivationFailed { services: failed },
            );
        }

        self.validate(stage, plan, &specs, &mut outcomes).await;

        let rejected: Vec<ServiceId> = outcomes
            .iter()
            .filter(|o| o.accepted == Some(false))
            .map(|o| o.service.clone())
            .collect();
        if !rejected.is_empty() {
            tracing::warn!(stage = %stage.name, ?rejected, "stage validation failed");
            return StageResult::failed(
                &stage.name,
                outcomes,
                StageFailure::StageValidationFailed { services: rejected },
            );
        }

        tracing::info!(stage = %stage.name, "stage active");
        StageResult::succeeded(&stage.name, outcomes)
    }

    async fn prepare(&self, stage: &Stage, spec: &ServiceSpec) -> Result<(), String> {
        match tokio::time::timeout(
            stage.activation_timeout,
            self.runtime.prepare(spec, &stage.overrides),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", stage.activation_timeout)),
        }
    }

    /// One task per member; waits for all of them before returning.
    async fn activate_parallel(&self, stage: &Stage, specs: Vec<ServiceSpec>) -> Vec<ServiceOutcome> {
        let ids: Vec<ServiceId> = specs.iter().map(|s| s.id.clone()).collect();
        let tasks = specs.into_iter().map(|spec| {
            let runtime = Arc::clone(&self.runtime);
            let limit = spec.activation_timeout.min(stage.activation_timeout);
            tokio::spawn(async move { activate_with_retry(runtime.as_ref(), &spec, limit).await })
        });

        join_all(tasks)
            .await
            .into_iter()
            .zip(ids)
            .map(|(joined, service)| {
                let (activation, attempts) = joined.unwrap_or_else(|e| {
                    (
                        ActivationOutcome::Failure {
                            reason: format!("activation task aborted: {e}"),
                        },
                        1,
                    )
                });
                log_outcome(&service, &activation);
                ServiceOutcome {
                    service,
                    activation,
                    attempts,
                    health: None,
                    accepted: None,
                }
            })
            .collect()
    }

    /// Declared order; members after the first failure are skipped.
    async fn activate_sequential(&self, stage: &Stage, specs: &[ServiceSpec]) -> Vec<ServiceOutcome> {
        let mut outcomes = Vec::with_capacity(specs.len());
        let mut halted = false;

        for spec in specs {
            if halted {
                outcomes.push(ServiceOutcome::skipped(spec.id.clone()));
                continue;
            }

            let limit = spec.activation_timeout.min(stage.activation_timeout);
            let (activation, attempts) =
                activate_with_retry(self.runtime.as_ref(), spec, limit).await;
            log_outcome(&spec.id, &activation);
            halted = activation != ActivationOutcome::Success;
            outcomes.push(ServiceOutcome {
                service: spec.id.clone(),
                activation,
                attempts,
                health: None,
                accepted: None,
            });
        }

        outcomes
    }

    /// Health-check every active member against one shared stage deadline.
    async fn validate(
        &self,
        stage: &Stage,
        plan: &DeploymentPlan,
        specs: &[ServiceSpec],
        outcomes: &mut [ServiceOutcome],
    ) {
        let deadline = Instant::now() + stage.validation_timeout;
        let reports = join_all(specs.iter().map(|spec| async move {
            let dependencies = plan.dependencies_of(spec);
            tokio::time::timeout_at(deadline, self.validator.check(spec, &dependencies))
                .await
                .unwrap_or_else(|_| {
                    tracing::warn!(service = %spec.id, "health validation timed out");
                    HealthReport::timed_out(spec.id.clone())
                })
        }))
        .await;

        for (outcome, report) in outcomes.iter_mut().zip(reports) {
            outcome.accepted = Some(stage.success_criteria.accepts(report.status));
            outcome.health = Some(report);
        }
    }
}

/// Activate one service, retrying errors up to its configured attempts.
///
/// A timed-out attempt is final.
async fn activate_with_retry(
    runtime: &dyn ServiceRuntime,
    spec: &ServiceSpec,
    limit: Duration,
) -> (ActivationOutcome, u32) {
    let max_attempts = spec.retry.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match tokio::time::timeout(limit, runtime.activate(spec)).await {
            Ok(Ok(())) => return (ActivationOutcome::Success, attempt),
            Ok(Err(e)) if attempt < max_attempts => {
                tracing::warn!(
                    service = %spec.id,
                    attempt,
                    max_attempts,
                    error = %e,
                    "activation failed, retrying"
                );
                tokio::time::sleep(spec.retry.delay).await;
            }
            Ok(Err(e)) => {
                return (
                    ActivationOutcome::Failure {
                        reason: e.to_string(),
                    },
                    attempt,
                );
            }
            Err(_) => {
                let after_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                return (ActivationOutcome::Timeout { after_ms }, attempt);
            }
        }
    }
}

fn log_outcome(service: &ServiceId, activation: &ActivationOutcome) {
    match activation {
        ActivationOutcome::Success => tracing::info!(service = %service, "activated"),
        ActivationOutcome::Failure { reason } => {
            tracing::warn!(service = %service, %reason, "activation failed")
        }
        ActivationOutcome::Timeout { after_ms } => {
            tracing::warn!(service = %service, after_ms, "activation timed out")
        }
        ActivationOutcome::Skipped => tracing::debug!(service = %service, "skipped"),
    }
}
