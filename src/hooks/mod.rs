// ABOUTME: Script hook for emergency procedures after an unexpected deployment fault.
// ABOUTME: Discovers and executes .convoy/hooks/emergency with the failure context in env vars.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::collaborators::{CollaboratorError, EmergencyContext, EmergencyProcedures};
use crate::types::ServiceId;

pub const EMERGENCY_HOOK: &str = "emergency";

/// Convert an emergency context to hook environment variables.
pub fn hook_env(context: &EmergencyContext) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert(
        "CONVOY_DEPLOYMENT_ID".to_string(),
        context.deployment_id.to_string(),
    );
    env.insert("CONVOY_DEPLOYMENT".to_string(), context.deployment.clone());
    env.insert("CONVOY_ENVIRONMENT".to_string(), context.environment.clone());
    env.insert("CONVOY_PHASE".to_string(), context.phase.to_string());
    env.insert("CONVOY_ERROR".to_string(), context.error.clone());
    env.insert(
        "CONVOY_ACTIVATED_SERVICES".to_string(),
        join(&context.activated_services),
    );
    env.insert(
        "CONVOY_FAILED_SERVICES".to_string(),
        join(&context.failed_services),
    );
    env
}

fn join(services: &BTreeSet<ServiceId>) -> String {
    services
        .iter()
        .map(ServiceId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Outcome of one script invocation.
#[derive(Debug)]
pub struct HookResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl HookResult {
    fn from_output(output: std::process::Output) -> Self {
        HookResult {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    fn spawn_failed(error: std::io::Error) -> Self {
        HookResult {
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: error.to_string(),
        }
    }
}

/// [`EmergencyProcedures`] backed by `<project>/.convoy/hooks/emergency`.
///
/// The script runs with the project directory as its working directory. A
/// project without the script has no emergency procedures, which is not an
/// error.
pub struct ScriptHooks {
    project_dir: PathBuf,
}

impl ScriptHooks {
    pub fn new(project_dir: &Path) -> Self {
        ScriptHooks {
            project_dir: project_dir.to_path_buf(),
        }
    }

    pub fn hook_exists(&self) -> bool {
        self.hook_path().is_file()
    }

    fn hook_path(&self) -> PathBuf {
        self.project_dir
            .join(".convoy")
            .join("hooks")
            .join(EMERGENCY_HOOK)
    }

    /// Run the script, or return `None` when the project has none.
    pub async fn run(&self, context: &EmergencyContext) -> Option<HookResult> {
        let script = self.hook_path();
        if !script.is_file() {
            return None;
        }

        tracing::info!(
            deployment = %context.deployment_id,
            script = %script.display(),
            "running emergency hook"
        );

        let result = Command::new(&script)
            .current_dir(&self.project_dir)
            .envs(hook_env(context))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_or_else(HookResult::spawn_failed, HookResult::from_output);

        match (result.success, result.exit_code) {
            (true, _) => tracing::info!("emergency hook finished"),
            (false, Some(code)) => tracing::warn!(code, "emergency hook exited unsuccessfully"),
            (false, None) => tracing::error!(error = %result.stderr, "emergency hook did not run"),
        }
        Some(result)
    }
}

#[async_trait]
impl EmergencyProcedures for ScriptHooks {
    async fn execute(&self, context: &EmergencyContext) -> Result<(), CollaboratorError> {
        match self.run(context).await {
            None => {
                tracing::warn!("no emergency hook at {}", self.hook_path().display());
                Ok(())
            }
            Some(result) if result.success => Ok(()),
            Some(result) => Err(CollaboratorError::Failed(format!(
                "emergency hook exited with {:?}: {}",
                result.exit_code,
                result.stderr.trim()
            ))),
        }
    }
}
