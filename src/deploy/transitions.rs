// ABOUTME: Phase transition methods for a deployment attempt.
// ABOUTME: Each method consumes the attempt and returns the next state or the terminal result.

use snafu::ResultExt;
use std::future::Future;
use std::time::Duration;

use super::attempt::Attempt;
use super::error::{
    DeploymentError, FailureContext, GraphSnafu, PreparationSnafu, ReadinessSnafu, ValidationSnafu,
};
use super::orchestrator::Engine;
use super::result::{DeploymentPhase, DeploymentResult};
use super::state::{Activated, Prepared, Ready, Validated, Validating};
use crate::activation::SequenceContext;
use crate::collaborators::{
    Alert, CollaboratorError, ConfigSnapshot, ProvisionedResources, ProvisioningOutcome, Severity,
};
use crate::diagnostics::Warning;
use crate::graph::DependencyGraph;
use crate::rollback::{RollbackRequest, RollbackStatus};

/// Result type for phases: the next state, or the finished (failed) result.
pub(crate) type PhaseResult<'a, S> = Result<Attempt<'a, S>, Box<DeploymentResult>>;

/// Preparation stopped part way; carries whatever needs cleaning up.
struct PreparationFailure {
    reason: String,
    snapshot: Option<ConfigSnapshot>,
    infrastructure: Option<ProvisionedResources>,
}

// =============================================================================
// Internal Helpers
// =============================================================================

impl<'a, S> Attempt<'a, S> {
    /// Move to the next state, building it from the current one.
    fn advance_with<T>(self, phase: DeploymentPhase, next: impl FnOnce(S) -> T) -> Attempt<'a, T> {
        self.progress.lock().enter(phase);
        Attempt {
            env: self.env,
            plan: self.plan,
            progress: self.progress,
            state: next(self.state),
        }
    }

    fn skip_rollback(&self, left_behind: &str) {
        self.progress.lock().warn(Warning::rollback_disabled(format!(
            "automatic rollback disabled, {left_behind} left in place"
        )));
    }

    /// Finish the attempt as failed, alerting if a rollback ran.
    ///
    /// Ends in `RolledBack` only when every rollback target was confirmed
    /// stopped; an unrecoverable rollback ends in `Failed`.
    async fn terminate(self, engine: &Engine, error: DeploymentError) -> Box<DeploymentResult> {
        let (context, deployment, rollback) = {
            let progress = self.progress.lock();
            (
                FailureContext::new(progress.phase, &error),
                progress.id.clone(),
                progress
                    .rollback
                    .as_ref()
                    .map(|result| (result.status, result.summary())),
            )
        };
        tracing::error!(
            deployment = %deployment,
            phase = %context.phase,
            error = %error,
            "deployment failed"
        );

        let terminal = match rollback {
            Some((status, summary)) => {
                let alert = Alert {
                    deployment,
                    severity: if status == RollbackStatus::Succeeded {
                        Severity::High
                    } else {
                        Severity::Critical
                    },
                    summary: format!("{error}; {summary}"),
                };
                let sent = bounded(
                    self.plan.timeouts.monitoring,
                    engine.collaborators.monitoring.send_alert(&alert),
                )
                .await;
                if let Err(reason) = sent {
                    self.progress
                        .lock()
                        .warn(Warning::alert_delivery(format!("sending rollback alert: {reason}")));
                }
                // Services left running mean the environment was not restored.
                if status == RollbackStatus::Unrecoverable {
                    DeploymentPhase::Failed
                } else {
                    DeploymentPhase::RolledBack
                }
            }
            None => DeploymentPhase::Failed,
        };

        Box::new(self.progress.lock().finish(terminal, Some(context)))
    }
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, String>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {limit:?}")),
    }
}

// =============================================================================
// Validating -> Preparing
// =============================================================================

impl<'a> Attempt<'a, Validating> {
    /// Check environment prerequisites and build the dependency graph.
    ///
    /// Nothing has been touched yet, so a failure here is terminal without rollback.
    pub(crate) async fn validate(self, engine: &Engine) -> PhaseResult<'a, Validated> {
        let limit = self.plan.timeouts.validation;
        let errors = match bounded(
            limit,
            engine.collaborators.environment.validate(self.env, self.plan),
        )
        .await
        {
            Ok(result) => result.errors,
            Err(reason) => vec![format!("environment validation: {reason}")],
        };
        if !errors.is_empty() {
            return Err(self.terminate(engine, ValidationSnafu { errors }.build()).await);
        }

        let graph = DependencyGraph::build(&self.plan.services)
            .and_then(|graph| graph.with_stages(&self.plan.order))
            .context(GraphSnafu);
        match graph {
            Ok(graph) => Ok(self.advance(DeploymentPhase::Preparing, Validated { graph })),
            Err(error) => Err(self.terminate(engine, error).await),
        }
    }
}

// =============================================================================
// Preparing -> Activating
// =============================================================================

impl<'a> Attempt<'a, Validated> {
    /// Snapshot, merge and distribute configuration, and provision infrastructure.
    ///
    /// On failure only preparation side effects are undone: the snapshot is
    /// restored and any provisioned infrastructure released.
    pub(crate) async fn prepare(self, engine: &Engine) -> PhaseResult<'a, Prepared> {
        let prepared = self.run_preparation(engine).await;
        let failure = match prepared {
            Ok((snapshot, infrastructure)) => {
                return Ok(
                    self.advance_with(DeploymentPhase::Activating, |Validated { graph }| {
                        Prepared {
                            graph,
                            snapshot,
                            infrastructure,
                        }
                    }),
                );
            }
            Err(failure) => failure,
        };

        if failure.snapshot.is_some() || failure.infrastructure.is_some() {
            if self.plan.rollback.enabled {
                let result = engine
                    .rollback
                    .cleanup(failure.snapshot.as_ref(), failure.infrastructure.as_ref())
                    .await;
                self.progress.lock().record_rollback(result);
            } else {
                self.skip_rollback("partially prepared configuration and infrastructure");
            }
        }

        let error = PreparationSnafu {
            reason: failure.reason,
        }
        .build();
        Err(self.terminate(engine, error).await)
    }

    async fn run_preparation(
        &self,
        engine: &Engine,
    ) -> Result<(ConfigSnapshot, ProvisionedResources), PreparationFailure> {
        let limit = self.plan.timeouts.preparation;
        let configuration = &engine.collaborators.configuration;

        let snapshot = bounded(limit, configuration.snapshot(self.env))
            .await
            .map_err(|reason| PreparationFailure {
                reason: format!("capturing configuration snapshot: {reason}"),
                snapshot: None,
                infrastructure: None,
            })?;
        tracing::debug!(snapshot = %snapshot.id(), "configuration snapshot captured");

        let fail = |reason: String, infrastructure: Option<ProvisionedResources>| PreparationFailure {
            reason,
            snapshot: Some(snapshot.clone()),
            infrastructure,
        };

        let overrides = self
            .env
            .resolved_overrides()
            .map_err(|e| fail(format!("resolving environment overrides: {e}"), None))?;

        let merged = bounded(limit, configuration.load_merge_validate(self.env, &overrides))
            .await
            .map_err(|reason| fail(format!("loading configuration: {reason}"), None))?;

        let provisioning = bounded(
            limit,
            engine
                .collaborators
                .provisioner
                .provision_infrastructure(&self.env.requirements, &self.env.resources),
        )
        .await;
        let infrastructure = match provisioning {
            Ok(ProvisioningOutcome::Provisioned(resources)) => resources,
            Ok(ProvisioningOutcome::PartialFailure {
                provisioned,
                reason,
            }) => {
                return Err(fail(
                    format!("provisioning infrastructure: {reason}"),
                    Some(provisioned),
                ));
            }
            Err(reason) => {
                return Err(fail(format!("provisioning infrastructure: {reason}"), None));
            }
        };

        bounded(
            limit,
            configuration.distribute(&merged, &self.plan.service_ids()),
        )
        .await
        .map_err(|reason| {
            fail(
                format!("distributing configuration: {reason}"),
                Some(infrastructure.clone()),
            )
        })?;

        Ok((snapshot, infrastructure))
    }
}

// =============================================================================
// Activating -> ValidatingReadiness
// =============================================================================

impl<'a> Attempt<'a, Prepared> {
    pub(crate) async fn activate(self, engine: &Engine) -> PhaseResult<'a, Activated> {
        let outcome = engine
            .sequencer
            .run(SequenceContext {
                plan: self.plan,
                graph: &self.state.graph,
                snapshot: Some(&self.state.snapshot),
                infrastructure: Some(&self.state.infrastructure),
            })
            .await;

        {
            let mut progress = self.progress.lock();
            progress.stage_results = outcome.stage_results;
            progress.activated = outcome.activated;
            progress.failed = outcome.failed;
            progress.integration = outcome.integration;
            if let Some(rollback) = outcome.rollback {
                progress.record_rollback(rollback);
            }
        }

        match outcome.error {
            None => Ok(self.advance_with(DeploymentPhase::ValidatingReadiness, |prepared| {
                Activated { prepared }
            })),
            Some(error) => {
                if !self.plan.rollback.enabled {
                    self.skip_rollback("activated services");
                }
                Err(self.terminate(engine, error.into()).await)
            }
        }
    }
}

// =============================================================================
// ValidatingReadiness -> Finalizing
// =============================================================================

impl<'a> Attempt<'a, Activated> {
    /// Any critical issue rolls back every activated service.
    pub(crate) async fn validate_readiness(self, engine: &Engine) -> PhaseResult<'a, Ready> {
        let activated = self.progress.lock().activated.clone();
        let report = engine.readiness.validate(&self.env.name, &activated).await;
        let blocking: Vec<String> = report
            .critical_issues()
            .map(|issue| format!("{}: {}", issue.category, issue.description))
            .collect();

        {
            let mut progress = self.progress.lock();
            for issue in report.warnings() {
                progress.warn(Warning::readiness(format!(
                    "{} ({}): {}",
                    issue.category, issue.severity, issue.description
                )));
            }
            progress.readiness = Some(report);
        }

        if blocking.is_empty() {
            return Ok(self.advance(DeploymentPhase::Finalizing, Ready));
        }

        if self.plan.rollback.enabled {
            let prepared = &self.state.prepared;
            let result = engine
                .rollback
                .rollback(
                    self.plan,
                    &prepared.graph,
                    RollbackRequest {
                        targets: activated,
                        snapshot: Some(&prepared.snapshot),
                        infrastructure: Some(&prepared.infrastructure),
                    },
                )
                .await;
            self.progress.lock().record_rollback(result);
        } else {
            self.skip_rollback("activated services");
        }

        let error = ReadinessSnafu { issues: blocking }.build();
        Err(self.terminate(engine, error).await)
    }
}

// =============================================================================
// Finalizing -> Completed
// =============================================================================

impl<'a> Attempt<'a, Ready> {
    /// Initialise monitoring and produce the successful result.
    ///
    /// Monitoring problems are warnings; nothing is rolled back from here.
    pub(crate) async fn finalize(self, engine: &Engine) -> DeploymentResult {
        let activated = self.progress.lock().activated.clone();
        let monitoring = bounded(
            self.plan.timeouts.monitoring,
            engine.collaborators.monitoring.initialize_monitoring(&activated),
        )
        .await;

        let mut progress = self.progress.lock();
        match monitoring {
            Ok(result) => progress.monitoring = Some(result),
            Err(reason) => progress.warn(Warning::monitoring_init(format!(
                "initializing monitoring: {reason}"
            ))),
        }
        tracing::info!(
            deployment = %progress.id,
            services = activated.len(),
            "deployment complete"
        );
        progress.finish(DeploymentPhase::Completed, None)
    }
}
