// ABOUTME: Four-tier health validation for a single service.
// ABOUTME: Endpoint, dependencies, readiness probes, then performance baselines.

mod status;

pub use status::{HealthReport, HealthStatus, HealthTier, ProbeOutcome, TierCheck};

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HealthSettings;
use crate::plan::ServiceSpec;
use crate::runtime::{HealthProbe, ProbeError};

/// Runs the health probe sequence for one service at a time.
pub struct HealthValidator {
    probe: Arc<dyn HealthProbe>,
    settings: HealthSettings,
}

impl HealthValidator {
    pub fn new(probe: Arc<dyn HealthProbe>, settings: HealthSettings) -> Self {
        HealthValidator { probe, settings }
    }

    /// Probe `service` and classify it.
    ///
    /// A failing primary endpoint stops the sequence, so later tiers can never
    /// mask it. Every other tier always runs.
    pub async fn check(&self, service: &ServiceSpec, dependencies: &[&ServiceSpec]) -> HealthReport {
        let mut checks = Vec::new();

        let endpoint = bounded(
            self.settings.endpoint_timeout,
            self.probe.check_endpoint(service),
        )
        .await;
        let endpoint_passed = endpoint.passed();
        checks.push(TierCheck {
            tier: HealthTier::Endpoint,
            name: service.health_endpoint.clone(),
            outcome: endpoint,
        });
        if !endpoint_passed {
            tracing::warn!(service = %service.id, "primary health endpoint failed");
            return HealthReport::from_checks(service.id.clone(), checks);
        }

        let dependency_checks = join_all(dependencies.iter().map(|dependency| async move {
            let outcome = bounded(
                self.settings.dependency_timeout,
                self.probe.check_endpoint(dependency),
            )
            .await;
            TierCheck {
                tier: HealthTier::Dependencies,
                name: dependency.id.to_string(),
                outcome,
            }
        }))
        .await;
        checks.extend(dependency_checks);

        for probe in &service.readiness_probes {
            let outcome = bounded(
                self.settings.readiness_timeout,
                self.probe.check_readiness(service, probe),
            )
            .await;
            checks.push(TierCheck {
                tier: HealthTier::Readiness,
                name: probe.name.clone(),
                outcome,
            });
        }

        for baseline in &service.performance_baselines {
            let sample = async {
                match self.probe.sample_metric(service, &baseline.metric).await {
                    Ok(value) if baseline.accepts(value) => Ok(()),
                    Ok(value) => Err(ProbeError::Unhealthy(format!(
                        "{} = {} outside baseline",
                        baseline.metric, value
                    ))),
                    Err(e) => Err(e),
                }
            };
            let outcome = bounded(self.settings.performance_timeout, sample).await;
            checks.push(TierCheck {
                tier: HealthTier::Performance,
                name: baseline.metric.clone(),
                outcome,
            });
        }

        let report = HealthReport::from_checks(service.id.clone(), checks);
        for failure in report.failures() {
            tracing::warn!(
                service = %service.id,
                tier = ?failure.tier,
                check = %failure.name,
                "health check did not pass"
            );
        }
        tracing::debug!(service = %service.id, status = %report.status, "health validated");
        report
    }
}

async fn bounded<F>(limit: Duration, probe: F) -> ProbeOutcome
where
    F: Future<Output = Result<(), ProbeError>>,
{
    match tokio::time::timeout(limit, probe).await {
        Ok(Ok(())) => ProbeOutcome::Passed,
        Ok(Err(e)) => ProbeOutcome::Failed(e.to_string()),
        Err(_) => ProbeOutcome::TimedOut,
    }
}
