// ABOUTME: Root deployment orchestrator driving the five-phase state machine.
// ABOUTME: Catches unexpected faults, runs emergency procedures, and always returns a result.

use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::attempt::{Attempt, Progress};
use super::error::{FailureContext, UnexpectedSnafu};
use super::result::{DeploymentPhase, DeploymentResult};
use super::state::Validating;
use crate::activation::{ActivationSequencer, StageExecutor};
use crate::collaborators::Collaborators;
use crate::config::EnvironmentConfig;
use crate::diagnostics::Warning;
use crate::health::HealthValidator;
use crate::plan::DeploymentPlan;
use crate::readiness::ReadinessValidator;
use crate::rollback::RollbackManager;
use crate::types::DeploymentId;

/// Components wired for one attempt from the plan's settings.
pub(crate) struct Engine {
    pub(crate) collaborators: Collaborators,
    pub(crate) rollback: Arc<RollbackManager>,
    pub(crate) sequencer: ActivationSequencer,
    pub(crate) readiness: ReadinessValidator,
}

impl Engine {
    fn new(collaborators: &Collaborators, plan: &DeploymentPlan) -> Self {
        let collaborators = collaborators.clone();
        let rollback = Arc::new(RollbackManager::new(
            Arc::clone(&collaborators.runtime),
            Arc::clone(&collaborators.configuration),
            Arc::clone(&collaborators.provisioner),
            plan.rollback,
        ));
        let validator = Arc::new(HealthValidator::new(
            Arc::clone(&collaborators.probe),
            plan.health,
        ));
        let sequencer = ActivationSequencer::new(
            StageExecutor::new(Arc::clone(&collaborators.runtime), validator),
            Arc::clone(&collaborators.integration),
            Arc::clone(&rollback),
        );
        let readiness = ReadinessValidator::new(
            Arc::clone(&collaborators.security),
            Arc::clone(&collaborators.readiness),
            plan.timeouts.readiness,
        );

        Engine {
            collaborators,
            rollback,
            sequencer,
            readiness,
        }
    }
}

/// Runs deployment attempts against the collaborators it was built with.
///
/// Each call to [`deploy`](Self::deploy) is an independent attempt with its
/// own identifier, snapshot and rollback ledger.
#[derive(Debug, Clone)]
pub struct DeploymentOrchestrator {
    collaborators: Collaborators,
}

impl DeploymentOrchestrator {
    pub fn new(collaborators: Collaborators) -> Self {
        DeploymentOrchestrator { collaborators }
    }

    /// Deploy `plan` into `env`.
    ///
    /// Never fails and never panics: every outcome, including an unexpected
    /// fault inside a collaborator, is reported through the returned result.
    pub async fn deploy(&self, env: &EnvironmentConfig, plan: &DeploymentPlan) -> DeploymentResult {
        let engine = Engine::new(&self.collaborators, plan);
        let id = DeploymentId::generate();
        tracing::info!(deployment = %id, name = %plan.name, environment = %env.name, "starting deployment");

        let progress = Arc::new(Mutex::new(Progress::new(id, plan, env)));
        let attempt = Attempt::start(env, plan, Arc::clone(&progress));

        match AssertUnwindSafe(run_phases(&engine, attempt))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(failed)) => *failed,
            Err(panic) => self.recover(plan, &progress, panic_message(panic.as_ref())).await,
        }
    }

    /// Hand the fault to emergency procedures and close the attempt as failed.
    async fn recover(
        &self,
        plan: &DeploymentPlan,
        progress: &Mutex<Progress>,
        message: String,
    ) -> DeploymentResult {
        let (phase, context) = {
            let progress = progress.lock();
            (progress.phase, progress.emergency_context(&message))
        };
        tracing::error!(%phase, %message, "unexpected fault, running emergency procedures");

        let hook = tokio::time::timeout(
            plan.timeouts.emergency,
            self.collaborators.emergency.execute(&context),
        )
        .await;

        let mut progress = progress.lock();
        match hook {
            Ok(Ok(())) => {}
            Ok(Err(e)) => progress.warn(Warning::emergency_procedure(format!(
                "emergency procedures failed: {e}"
            ))),
            Err(_) => progress.warn(Warning::emergency_procedure(format!(
                "emergency procedures timed out after {:?}",
                plan.timeouts.emergency
            ))),
        }

        let error = UnexpectedSnafu { phase, message }.build();
        progress.finish(DeploymentPhase::Failed, Some(FailureContext::new(phase, &error)))
    }
}

async fn run_phases(
    engine: &Engine,
    attempt: Attempt<'_, Validating>,
) -> Result<DeploymentResult, Box<DeploymentResult>> {
    let validated = attempt.validate(engine).await?;
    let prepared = validated.prepare(engine).await?;
    let activated = prepared.activate(engine).await?;
    let ready = activated.validate_readiness(engine).await?;
    Ok(ready.finalize(engine).await)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
