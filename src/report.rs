// ABOUTME: Rendering of a finished deployment for people and for scripts.
// ABOUTME: Supports a plain text summary and a JSON document.

use std::fmt::Write;

use crate::activation::ActivationOutcome;
use crate::deploy::DeploymentResult;

/// Report format for a finished deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-friendly multi-line summary
    Text,
    /// Single JSON document for scripting
    Json,
}

pub fn render(result: &DeploymentResult, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(render_text(result)),
        ReportFormat::Json => serde_json::to_string_pretty(result),
    }
}

fn render_text(result: &DeploymentResult) -> String {
    let mut out = String::new();
    let secs = result.duration().num_milliseconds() as f64 / 1000.0;

    // Writing to a String cannot fail.
    let _ = writeln!(
        out,
        "Deployment {} ({}) to {}: {:?} [{}] ({:.1}s)",
        result.deployment(),
        result.id(),
        result.environment(),
        result.status(),
        result.phase(),
        secs
    );

    for stage in result.stage_results() {
        let _ = writeln!(out, "  stage {}: {:?}", stage.stage, stage.status);
        for outcome in &stage.outcomes {
            let activation = match &outcome.activation {
                ActivationOutcome::Success => "success".to_string(),
                ActivationOutcome::Failure { reason } => format!("failure ({reason})"),
                ActivationOutcome::Timeout { after_ms } => format!("timeout after {after_ms}ms"),
                ActivationOutcome::Skipped => "skipped".to_string(),
            };
            let health = outcome
                .health
                .as_ref()
                .map(|report| format!(", {}", report.status))
                .unwrap_or_default();
            let _ = writeln!(out, "    {}: {}{}", outcome.service, activation, health);
        }
    }

    if let Some(rollback) = result.rollback() {
        let _ = writeln!(out, "  rollback: {:?}", rollback.status);
        for entry in &rollback.services {
            match &entry.detail {
                Some(detail) => {
                    let _ = writeln!(out, "    {}: {:?} ({})", entry.service, entry.outcome, detail);
                }
                None => {
                    let _ = writeln!(out, "    {}: {:?}", entry.service, entry.outcome);
                }
            }
        }
    }

    if let Some(readiness) = result.readiness() {
        let _ = writeln!(out, "  readiness: {:?}", readiness.verdict);
    }

    for warning in result.warnings() {
        let _ = writeln!(out, "  warning {warning}");
    }

    if let Some(error) = result.error() {
        let _ = writeln!(out, "  error ({:?} while {}): {}", error.kind, error.phase, error.message);
    }

    out
}
