// ABOUTME: Non-fatal warnings gathered while a deployment attempt runs.
// ABOUTME: Each warning is logged when recorded and copied into the final result.

use serde::Serialize;
use std::fmt;

/// Warnings recorded during one deployment attempt, in the order they occurred.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = warning.kind.label(), "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

macro_rules! warning_constructors {
    ($($name:ident => $kind:ident),* $(,)?) => {
        impl Warning {
            $(
                pub fn $name(message: impl Into<String>) -> Self {
                    Warning { kind: WarningKind::$kind, message: message.into() }
                }
            )*
        }
    };
}

warning_constructors! {
    monitoring_init => MonitoringInit,
    alert_delivery => AlertDelivery,
    readiness => Readiness,
    rollback_disabled => RollbackDisabled,
    rollback_incomplete => RollbackIncomplete,
    emergency_procedure => EmergencyProcedure,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.label(), self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Monitoring could not be initialised after a successful deployment.
    MonitoringInit,
    AlertDelivery,
    /// Non-critical production readiness issue.
    Readiness,
    /// A failure needed rollback but automatic rollback is switched off.
    RollbackDisabled,
    /// Rollback ran but left at least one service not cleanly undone.
    RollbackIncomplete,
    EmergencyProcedure,
}

impl WarningKind {
    pub fn label(self) -> &'static str {
        match self {
            WarningKind::MonitoringInit => "monitoring",
            WarningKind::AlertDelivery => "alert",
            WarningKind::Readiness => "readiness",
            WarningKind::RollbackDisabled => "rollback disabled",
            WarningKind::RollbackIncomplete => "rollback incomplete",
            WarningKind::EmergencyProcedure => "emergency",
        }
    }
}
