// ABOUTME: Production readiness validation run once every stage is active.
// ABOUTME: Five category checks; any critical issue blocks the deployment.

use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::{
    ComplianceTarget, Finding, ReadinessAssessor, ReadinessCategory, SecurityScanner, Severity,
};
use crate::types::ServiceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessVerdict {
    Ready,
    ReadyWithWarnings,
    NotReady,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessIssue {
    pub category: ReadinessCategory,
    pub severity: Severity,
    pub description: String,
}

impl ReadinessIssue {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    pub verdict: ReadinessVerdict,
    pub issues: Vec<ReadinessIssue>,
}

impl ReadinessReport {
    pub fn classify(issues: Vec<ReadinessIssue>) -> Self {
        let verdict = if issues.iter().any(ReadinessIssue::is_critical) {
            ReadinessVerdict::NotReady
        } else if issues.is_empty() {
            ReadinessVerdict::Ready
        } else {
            ReadinessVerdict::ReadyWithWarnings
        };
        ReadinessReport { verdict, issues }
    }

    pub fn critical_issues(&self) -> impl Iterator<Item = &ReadinessIssue> {
        self.issues.iter().filter(|issue| issue.is_critical())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ReadinessIssue> {
        self.issues.iter().filter(|issue| !issue.is_critical())
    }
}

pub struct ReadinessValidator {
    security: Arc<dyn SecurityScanner>,
    assessor: Arc<dyn ReadinessAssessor>,
    timeout: Duration,
}

impl ReadinessValidator {
    pub fn new(
        security: Arc<dyn SecurityScanner>,
        assessor: Arc<dyn ReadinessAssessor>,
        timeout: Duration,
    ) -> Self {
        ReadinessValidator {
            security,
            assessor,
            timeout,
        }
    }

    /// Run every category check concurrently and classify the combined issues.
    ///
    /// A check that errors or misses its deadline is reported as a critical
    /// issue in its category.
    pub async fn validate(&self, environment: &str, services: &BTreeSet<ServiceId>) -> ReadinessReport {
        let checks = ReadinessCategory::ALL
            .into_iter()
            .map(|category| self.check(category, environment, services));
        let issues: Vec<ReadinessIssue> = join_all(checks).await.into_iter().flatten().collect();

        let report = ReadinessReport::classify(issues);
        for issue in &report.issues {
            tracing::warn!(
                category = %issue.category,
                severity = %issue.severity,
                "{}",
                issue.description
            );
        }
        tracing::info!(verdict = ?report.verdict, "readiness validated");
        report
    }

    async fn check(
        &self,
        category: ReadinessCategory,
        environment: &str,
        services: &BTreeSet<ServiceId>,
    ) -> Vec<ReadinessIssue> {
        let findings = match category {
            ReadinessCategory::SecurityCompliance => {
                let target = ComplianceTarget {
                    environment: environment.to_string(),
                    services: services.clone(),
                };
                tokio::time::timeout(self.timeout, self.security.validate_compliance(&target))
                    .await
                    .map(|scan| scan.map(|result| result.violations))
            }
            other => tokio::time::timeout(self.timeout, self.assessor.assess(other, services)).await,
        };

        let findings = match findings {
            Ok(Ok(findings)) => findings,
            Ok(Err(e)) => vec![Finding::new(
                Severity::Critical,
                format!("{category} check failed: {e}"),
            )],
            Err(_) => vec![Finding::new(
                Severity::Critical,
                format!("{category} check timed out after {:?}", self.timeout),
            )],
        };

        findings
            .into_iter()
            .map(|finding| ReadinessIssue {
                category,
                severity: finding.severity,
                description: finding.description,
            })
            .collect()
    }
}
