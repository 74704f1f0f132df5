// ABOUTME: Test support utilities.
// ABOUTME: In-memory collaborators with scripted behaviour, plus plan builders.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Once};
use std::time::Duration;

use convoy::DeploymentOrchestrator;
use convoy::collaborators::{
    Alert, CollaboratorError, Collaborators, ComplianceResult, ComplianceTarget,
    ConfigSnapshot, ConfigurationManager, EmergencyContext, EmergencyProcedures,
    EnvironmentValidator, Finding, InMemoryConfiguration, IntegrationTestResult,
    IntegrationTester, MergedConfig, MonitoringDashboard, MonitoringResult, ProvisionedResources,
    ProvisioningOutcome, ReadinessAssessor, ReadinessCategory, ResourceProvisioner,
    SecurityScanner, ValidationResult,
};
use convoy::config::{
    DeploymentSpec, EnvironmentConfig, HealthSettings, IntegrationTest, ReadinessProbe,
    Requirements, RollbackSettings, ServiceKind,
};
use convoy::graph::DependencyGraph;
use convoy::health::HealthValidator;
use convoy::plan::{DeploymentPlan, RollbackProcedure, RollbackProcedures, ServiceSpec};
use convoy::rollback::RollbackManager;
use convoy::runtime::{HealthProbe, ProbeError, ProcedureError, ServiceError, ServiceRuntime};
use convoy::types::ServiceId;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("convoy=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn id(name: &str) -> ServiceId {
    ServiceId::new(name).unwrap()
}

pub fn ids(names: &[&str]) -> BTreeSet<ServiceId> {
    names.iter().map(|name| id(name)).collect()
}

/// Three services in two stages: db and cache in parallel, then api on top of both.
pub const SHOP_SPEC: &str = r#"
name: shop
services:
  - id: db
    kind: database
    health_endpoint: http://db/health
  - id: cache
    health_endpoint: http://cache/health
  - id: api
    kind: container
    health_endpoint: http://api/health
    dependencies: [db, cache]
activation:
  stages:
    - name: infra
      services: [db, cache]
      parallel: true
    - name: app
      services: [api]
"#;

// =============================================================================
// Service runtime
// =============================================================================

/// Scripted activation behaviour for one service.
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed,
    Fail(String),
    /// Fail the first `n` attempts, then succeed.
    FailTimes(u32),
    /// Never complete.
    Hang,
    /// Succeed after a delay.
    Delay(Duration),
    Panic,
}

/// Runtime that records every call and activates services in memory.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    behaviors: Mutex<HashMap<ServiceId, Behavior>>,
    prepare_failures: Mutex<HashMap<ServiceId, String>>,
    active: Mutex<BTreeSet<ServiceId>>,
    stuck: Mutex<BTreeSet<ServiceId>>,
    attempts: Mutex<HashMap<ServiceId, u32>>,
    events: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, service: &str, behavior: Behavior) {
        self.behaviors.lock().insert(id(service), behavior);
    }

    pub fn fail_prepare(&self, service: &str, reason: &str) {
        self.prepare_failures
            .lock()
            .insert(id(service), reason.to_string());
    }

    /// The service ignores rollback and stays active.
    pub fn keep_active(&self, service: &str) {
        self.stuck.lock().insert(id(service));
    }

    pub fn deactivate(&self, service: &ServiceId) {
        if !self.stuck.lock().contains(service) {
            self.active.lock().remove(service);
        }
    }

    pub fn active(&self) -> BTreeSet<ServiceId> {
        self.active.lock().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn attempts(&self, service: &str) -> u32 {
        self.attempts.lock().get(&id(service)).copied().unwrap_or(0)
    }

    fn record(&self, event: String) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl ServiceRuntime for FakeRuntime {
    async fn prepare(
        &self,
        service: &ServiceSpec,
        _overrides: &BTreeMap<String, String>,
    ) -> Result<(), ServiceError> {
        self.record(format!("prepare:{}", service.id));
        match self.prepare_failures.lock().get(&service.id) {
            Some(reason) => Err(ServiceError::PreparationFailed(reason.clone())),
            None => Ok(()),
        }
    }

    async fn activate(&self, service: &ServiceSpec) -> Result<(), ServiceError> {
        self.record(format!("activate:{}", service.id));
        let attempt = {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(service.id.clone()).or_insert(0);
            *count += 1;
            *count
        };
        let behavior = self
            .behaviors
            .lock()
            .get(&service.id)
            .cloned()
            .unwrap_or(Behavior::Succeed);

        match behavior {
            Behavior::Succeed => {}
            Behavior::Fail(reason) => return Err(ServiceError::ActivationFailed(reason)),
            Behavior::FailTimes(n) if attempt <= n => {
                return Err(ServiceError::ActivationFailed(format!(
                    "attempt {attempt} refused"
                )));
            }
            Behavior::FailTimes(_) => {}
            Behavior::Hang => std::future::pending::<()>().await,
            Behavior::Delay(delay) => tokio::time::sleep(delay).await,
            Behavior::Panic => panic!("runtime crashed activating {}", service.id),
        }

        self.active.lock().insert(service.id.clone());
        Ok(())
    }

    async fn isolate(&self, service: &ServiceId) -> Result<(), ServiceError> {
        self.record(format!("isolate:{service}"));
        Ok(())
    }

    async fn is_active(&self, service: &ServiceId) -> Result<bool, ServiceError> {
        Ok(self.active.lock().contains(service))
    }
}

/// Rollback procedure that deactivates the service in the fake runtime.
#[derive(Debug)]
pub struct RecordingProcedure {
    runtime: Arc<FakeRuntime>,
    executed: Mutex<Vec<ServiceId>>,
    failures: Mutex<BTreeSet<ServiceId>>,
}

impl RecordingProcedure {
    pub fn new(runtime: Arc<FakeRuntime>) -> Arc<Self> {
        Arc::new(RecordingProcedure {
            runtime,
            executed: Mutex::new(Vec::new()),
            failures: Mutex::new(BTreeSet::new()),
        })
    }

    pub fn fail_for(&self, service: &str) {
        self.failures.lock().insert(id(service));
    }

    pub fn executed(&self) -> Vec<ServiceId> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl RollbackProcedure for RecordingProcedure {
    async fn execute(&self, service: &ServiceSpec) -> Result<(), ProcedureError> {
        self.executed.lock().push(service.id.clone());
        if self.failures.lock().contains(&service.id) {
            return Err(ProcedureError(format!("could not stop {}", service.id)));
        }
        self.runtime.deactivate(&service.id);
        Ok(())
    }
}

// =============================================================================
// Health probe
// =============================================================================

#[derive(Debug, Default)]
pub struct FakeProbe {
    endpoint_failures: Mutex<BTreeSet<ServiceId>>,
    hanging_endpoints: Mutex<BTreeSet<ServiceId>>,
    readiness_failures: Mutex<BTreeSet<(ServiceId, String)>>,
    metrics: Mutex<HashMap<(ServiceId, String), f64>>,
    calls: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_endpoint(&self, service: &str) {
        self.endpoint_failures.lock().insert(id(service));
    }

    pub fn hang_endpoint(&self, service: &str) {
        self.hanging_endpoints.lock().insert(id(service));
    }

    pub fn fail_readiness(&self, service: &str, probe: &str) {
        self.readiness_failures
            .lock()
            .insert((id(service), probe.to_string()));
    }

    pub fn set_metric(&self, service: &str, metric: &str, value: f64) {
        self.metrics
            .lock()
            .insert((id(service), metric.to_string()), value);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl HealthProbe for FakeProbe {
    async fn check_endpoint(&self, service: &ServiceSpec) -> Result<(), ProbeError> {
        self.calls.lock().push(format!("endpoint:{}", service.id));
        if self.hanging_endpoints.lock().contains(&service.id) {
            std::future::pending::<()>().await;
        }
        if self.endpoint_failures.lock().contains(&service.id) {
            return Err(ProbeError::Unreachable(service.health_endpoint.clone()));
        }
        Ok(())
    }

    async fn check_readiness(
        &self,
        service: &ServiceSpec,
        probe: &ReadinessProbe,
    ) -> Result<(), ProbeError> {
        self.calls
            .lock()
            .push(format!("readiness:{}:{}", service.id, probe.name));
        let key = (service.id.clone(), probe.name.clone());
        if self.readiness_failures.lock().contains(&key) {
            return Err(ProbeError::Unhealthy(format!("{} not ready", probe.name)));
        }
        Ok(())
    }

    async fn sample_metric(&self, service: &ServiceSpec, metric: &str) -> Result<f64, ProbeError> {
        self.calls
            .lock()
            .push(format!("metric:{}:{}", service.id, metric));
        let key = (service.id.clone(), metric.to_string());
        Ok(self.metrics.lock().get(&key).copied().unwrap_or(0.0))
    }
}

// =============================================================================
// Collaborators
// =============================================================================

#[derive(Debug, Default)]
pub struct FakeEnvironment {
    errors: Mutex<Vec<String>>,
}

impl FakeEnvironment {
    pub fn reject(&self, error: &str) {
        self.errors.lock().push(error.to_string());
    }
}

#[async_trait]
impl EnvironmentValidator for FakeEnvironment {
    async fn validate(
        &self,
        _env: &EnvironmentConfig,
        _plan: &DeploymentPlan,
    ) -> Result<ValidationResult, CollaboratorError> {
        Ok(ValidationResult::with_errors(self.errors.lock().clone()))
    }
}

/// In-memory configuration that also counts restores.
#[derive(Debug)]
pub struct RecordingConfiguration {
    inner: InMemoryConfiguration,
    restores: Mutex<u32>,
}

impl RecordingConfiguration {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingConfiguration {
            inner: InMemoryConfiguration::new(BTreeMap::from([(
                "replicas".to_string(),
                "2".to_string(),
            )])),
            restores: Mutex::new(0),
        })
    }

    pub fn live(&self) -> BTreeMap<String, String> {
        self.inner.live()
    }

    pub fn restores(&self) -> u32 {
        *self.restores.lock()
    }
}

#[async_trait]
impl ConfigurationManager for RecordingConfiguration {
    async fn snapshot(&self, env: &EnvironmentConfig) -> Result<ConfigSnapshot, CollaboratorError> {
        self.inner.snapshot(env).await
    }

    async fn load_merge_validate(
        &self,
        env: &EnvironmentConfig,
        overrides: &BTreeMap<String, String>,
    ) -> Result<MergedConfig, CollaboratorError> {
        self.inner.load_merge_validate(env, overrides).await
    }

    async fn distribute(
        &self,
        config: &MergedConfig,
        services: &BTreeSet<ServiceId>,
    ) -> Result<(), CollaboratorError> {
        self.inner.distribute(config, services).await
    }

    async fn restore(&self, snapshot: &ConfigSnapshot) -> Result<(), CollaboratorError> {
        *self.restores.lock() += 1;
        self.inner.restore(snapshot).await
    }
}

#[derive(Debug, Default)]
pub struct FakeProvisioner {
    partial_failure: Mutex<Option<(Vec<String>, String)>>,
    released: Mutex<Vec<ProvisionedResources>>,
}

impl FakeProvisioner {
    /// Provision `created` and then stop with `reason`.
    pub fn fail_after(&self, created: &[&str], reason: &str) {
        *self.partial_failure.lock() = Some((
            created.iter().map(|r| r.to_string()).collect(),
            reason.to_string(),
        ));
    }

    pub fn released(&self) -> Vec<ProvisionedResources> {
        self.released.lock().clone()
    }
}

#[async_trait]
impl ResourceProvisioner for FakeProvisioner {
    async fn provision_infrastructure(
        &self,
        _requirements: &Requirements,
        allocations: &BTreeMap<String, String>,
    ) -> Result<ProvisioningOutcome, CollaboratorError> {
        if let Some((created, reason)) = self.partial_failure.lock().clone() {
            return Ok(ProvisioningOutcome::PartialFailure {
                provisioned: ProvisionedResources { resources: created },
                reason,
            });
        }
        let mut resources: Vec<String> = allocations.keys().cloned().collect();
        resources.push("network".to_string());
        Ok(ProvisioningOutcome::Provisioned(ProvisionedResources {
            resources,
        }))
    }

    async fn release(&self, resources: &ProvisionedResources) -> Result<(), CollaboratorError> {
        self.released.lock().push(resources.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeSecurity {
    violations: Mutex<Vec<Finding>>,
}

impl FakeSecurity {
    pub fn report(&self, finding: Finding) {
        self.violations.lock().push(finding);
    }
}

#[async_trait]
impl SecurityScanner for FakeSecurity {
    async fn validate_compliance(
        &self,
        _target: &ComplianceTarget,
    ) -> Result<ComplianceResult, CollaboratorError> {
        Ok(ComplianceResult {
            violations: self.violations.lock().clone(),
        })
    }
}

#[derive(Debug, Default)]
pub struct FakeIntegration {
    failures: Mutex<Vec<String>>,
    runs: Mutex<Vec<Vec<String>>>,
}

impl FakeIntegration {
    pub fn fail(&self, test: &str) {
        self.failures.lock().push(test.to_string());
    }

    /// Test names passed to each run.
    pub fn runs(&self) -> Vec<Vec<String>> {
        self.runs.lock().clone()
    }
}

#[async_trait]
impl IntegrationTester for FakeIntegration {
    async fn execute_integration_tests(
        &self,
        tests: &[IntegrationTest],
        _activated: &BTreeSet<ServiceId>,
    ) -> Result<IntegrationTestResult, CollaboratorError> {
        let names: Vec<String> = tests.iter().map(|t| t.name.clone()).collect();
        self.runs.lock().push(names.clone());
        let failures = self.failures.lock().clone();
        Ok(IntegrationTestResult {
            passed: names.into_iter().filter(|n| !failures.contains(n)).collect(),
            failures,
        })
    }
}

#[derive(Debug, Default)]
pub struct FakeMonitoring {
    unavailable: Mutex<bool>,
    initialized: Mutex<Vec<BTreeSet<ServiceId>>>,
    alerts: Mutex<Vec<Alert>>,
}

impl FakeMonitoring {
    pub fn go_down(&self) {
        *self.unavailable.lock() = true;
    }

    pub fn initialized(&self) -> Vec<BTreeSet<ServiceId>> {
        self.initialized.lock().clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }
}

#[async_trait]
impl MonitoringDashboard for FakeMonitoring {
    async fn initialize_monitoring(
        &self,
        activated: &BTreeSet<ServiceId>,
    ) -> Result<MonitoringResult, CollaboratorError> {
        if *self.unavailable.lock() {
            return Err(CollaboratorError::Unavailable("dashboard api".to_string()));
        }
        self.initialized.lock().push(activated.clone());
        Ok(MonitoringResult {
            dashboards: activated.iter().map(|s| format!("{s}-overview")).collect(),
        })
    }

    async fn send_alert(&self, alert: &Alert) -> Result<(), CollaboratorError> {
        if *self.unavailable.lock() {
            return Err(CollaboratorError::Unavailable("alerting api".to_string()));
        }
        self.alerts.lock().push(alert.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeAssessor {
    findings: Mutex<HashMap<ReadinessCategory, Vec<Finding>>>,
    failing: Mutex<BTreeSet<ReadinessCategory>>,
    hanging: Mutex<BTreeSet<ReadinessCategory>>,
}

impl FakeAssessor {
    pub fn report(&self, category: ReadinessCategory, finding: Finding) {
        self.findings.lock().entry(category).or_default().push(finding);
    }

    pub fn fail(&self, category: ReadinessCategory) {
        self.failing.lock().insert(category);
    }

    pub fn hang(&self, category: ReadinessCategory) {
        self.hanging.lock().insert(category);
    }
}

#[async_trait]
impl ReadinessAssessor for FakeAssessor {
    async fn assess(
        &self,
        category: ReadinessCategory,
        _services: &BTreeSet<ServiceId>,
    ) -> Result<Vec<Finding>, CollaboratorError> {
        if self.hanging.lock().contains(&category) {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().contains(&category) {
            return Err(CollaboratorError::Failed(format!("{category} assessor crashed")));
        }
        Ok(self.findings.lock().get(&category).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct FakeEmergency {
    contexts: Mutex<Vec<EmergencyContext>>,
}

impl FakeEmergency {
    pub fn contexts(&self) -> Vec<EmergencyContext> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl EmergencyProcedures for FakeEmergency {
    async fn execute(&self, context: &EmergencyContext) -> Result<(), CollaboratorError> {
        self.contexts.lock().push(context.clone());
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Every fake wired together, with handles kept for assertions.
pub struct Harness {
    pub runtime: Arc<FakeRuntime>,
    pub probe: Arc<FakeProbe>,
    pub procedure: Arc<RecordingProcedure>,
    pub environment: Arc<FakeEnvironment>,
    pub configuration: Arc<RecordingConfiguration>,
    pub provisioner: Arc<FakeProvisioner>,
    pub security: Arc<FakeSecurity>,
    pub integration: Arc<FakeIntegration>,
    pub monitoring: Arc<FakeMonitoring>,
    pub assessor: Arc<FakeAssessor>,
    pub emergency: Arc<FakeEmergency>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let runtime = FakeRuntime::new();
        Harness {
            procedure: RecordingProcedure::new(Arc::clone(&runtime)),
            runtime,
            probe: FakeProbe::new(),
            environment: Arc::default(),
            configuration: RecordingConfiguration::new(),
            provisioner: Arc::default(),
            security: Arc::default(),
            integration: Arc::default(),
            monitoring: Arc::default(),
            assessor: Arc::default(),
            emergency: Arc::default(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            runtime: self.runtime.clone(),
            probe: self.probe.clone(),
            environment: self.environment.clone(),
            configuration: self.configuration.clone(),
            provisioner: self.provisioner.clone(),
            security: self.security.clone(),
            integration: self.integration.clone(),
            monitoring: self.monitoring.clone(),
            readiness: self.assessor.clone(),
            emergency: self.emergency.clone(),
        }
    }

    pub fn orchestrator(&self) -> DeploymentOrchestrator {
        DeploymentOrchestrator::new(self.collaborators())
    }

    /// The recording procedure for every service kind.
    pub fn procedures(&self) -> RollbackProcedures {
        let procedure: Arc<dyn RollbackProcedure> = self.procedure.clone();
        [
            ServiceKind::Database,
            ServiceKind::Container,
            ServiceKind::Network,
            ServiceKind::Generic,
        ]
        .into_iter()
        .fold(RollbackProcedures::new(), |procedures, kind| {
            procedures.for_kind(kind, Arc::clone(&procedure))
        })
    }

    pub fn plan(&self, yaml: &str) -> DeploymentPlan {
        let spec = DeploymentSpec::from_yaml(yaml).unwrap();
        DeploymentPlan::assemble(spec, &self.procedures()).unwrap()
    }

    pub fn validator(&self) -> Arc<HealthValidator> {
        Arc::new(HealthValidator::new(
            self.probe.clone(),
            HealthSettings::default(),
        ))
    }

    pub fn rollback_manager(&self, settings: RollbackSettings) -> RollbackManager {
        RollbackManager::new(
            self.runtime.clone(),
            self.configuration.clone(),
            self.provisioner.clone(),
            settings,
        )
    }
}

pub fn graph(plan: &DeploymentPlan) -> DependencyGraph {
    DependencyGraph::build(&plan.services)
        .and_then(|graph| graph.with_stages(&plan.order))
        .unwrap()
}

pub fn env() -> EnvironmentConfig {
    EnvironmentConfig::new("staging")
}
