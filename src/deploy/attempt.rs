// ABOUTME: One deployment attempt parameterized by its current state.
// ABOUTME: Progress is the single mutable record that becomes the DeploymentResult.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::error::FailureContext;
use super::result::{DeploymentPhase, DeploymentResult, DeploymentStatus, PhaseTransition};
use super::state::Validating;
use crate::activation::StageResult;
use crate::collaborators::{EmergencyContext, IntegrationTestResult, MonitoringResult};
use crate::config::EnvironmentConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::plan::DeploymentPlan;
use crate::readiness::ReadinessReport;
use crate::rollback::RollbackResult;
use crate::types::{DeploymentId, ServiceId};

/// Everything recorded so far, shared with the panic handler.
#[derive(Debug)]
pub(crate) struct Progress {
    pub(crate) id: DeploymentId,
    pub(crate) deployment: String,
    pub(crate) environment: String,
    pub(crate) phase: DeploymentPhase,
    pub(crate) history: Vec<PhaseTransition>,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) stage_results: Vec<StageResult>,
    pub(crate) activated: BTreeSet<ServiceId>,
    pub(crate) failed: BTreeSet<ServiceId>,
    pub(crate) integration: Option<IntegrationTestResult>,
    pub(crate) rollback: Option<RollbackResult>,
    pub(crate) readiness: Option<ReadinessReport>,
    pub(crate) monitoring: Option<MonitoringResult>,
    pub(crate) diagnostics: Diagnostics,
}

impl Progress {
    pub(crate) fn new(id: DeploymentId, plan: &DeploymentPlan, env: &EnvironmentConfig) -> Self {
        let started_at = Utc::now();
        Progress {
            id,
            deployment: plan.name.clone(),
            environment: env.name.clone(),
            phase: DeploymentPhase::Validating,
            history: vec![PhaseTransition {
                phase: DeploymentPhase::Validating,
                at: started_at,
            }],
            started_at,
            stage_results: Vec::new(),
            activated: BTreeSet::new(),
            failed: BTreeSet::new(),
            integration: None,
            rollback: None,
            readiness: None,
            monitoring: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub(crate) fn enter(&mut self, phase: DeploymentPhase) {
        tracing::info!(deployment = %self.id, from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
        self.history.push(PhaseTransition {
            phase,
            at: Utc::now(),
        });
    }

    pub(crate) fn warn(&mut self, warning: Warning) {
        self.diagnostics.warn(warning);
    }

    /// Record a rollback result, flagging it when it did not fully succeed.
    pub(crate) fn record_rollback(&mut self, result: RollbackResult) {
        if !result.is_success() {
            self.warn(Warning::rollback_incomplete(result.summary()));
        }
        self.rollback = Some(result);
    }

    pub(crate) fn emergency_context(&self, error: &str) -> EmergencyContext {
        EmergencyContext {
            deployment_id: self.id.clone(),
            deployment: self.deployment.clone(),
            environment: self.environment.clone(),
            phase: self.phase,
            error: error.to_string(),
            activated_services: self.activated.clone(),
            failed_services: self.failed.clone(),
        }
    }

    /// Enter `terminal` and produce the immutable result.
    pub(crate) fn finish(
        &mut self,
        terminal: DeploymentPhase,
        error: Option<FailureContext>,
    ) -> DeploymentResult {
        self.enter(terminal);
        let status = if error.is_none() {
            DeploymentStatus::Success
        } else {
            DeploymentStatus::Failure
        };

        DeploymentResult {
            id: self.id.clone(),
            deployment: self.deployment.clone(),
            environment: self.environment.clone(),
            status,
            phase: terminal,
            stage_results: self.stage_results.clone(),
            activated_services: self.activated.clone(),
            failed_services: self.failed.clone(),
            integration: self.integration.clone(),
            rollback: self.rollback.clone(),
            readiness: self.readiness.clone(),
            monitoring: self.monitoring.clone(),
            error,
            warnings: self.diagnostics.warnings().to_vec(),
            history: self.history.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// A deployment attempt in progress, parameterized by its current state.
pub(crate) struct Attempt<'a, S> {
    pub(crate) env: &'a EnvironmentConfig,
    pub(crate) plan: &'a DeploymentPlan,
    pub(crate) progress: Arc<Mutex<Progress>>,
    pub(crate) state: S,
}

impl<'a> Attempt<'a, Validating> {
    pub(crate) fn start(
        env: &'a EnvironmentConfig,
        plan: &'a DeploymentPlan,
        progress: Arc<Mutex<Progress>>,
    ) -> Self {
        Attempt {
            env,
            plan,
            progress,
            state: Validating,
        }
    }
}

impl<'a, S> Attempt<'a, S> {
    /// Move to the next state, entering `phase`.
    pub(crate) fn advance<T>(self, phase: DeploymentPhase, state: T) -> Attempt<'a, T> {
        self.progress.lock().enter(phase);
        Attempt {
            env: self.env,
            plan: self.plan,
            progress: self.progress,
            state,
        }
    }
}
