use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{HostError, Result};
use crate::models::{
    CommandTemplate, DeployOutcome, DeploymentInfo, DeploymentStatus, HostConfig, PortAssignments,
    Timeouts,
};

use super::process;
use super::reclaim::{CommandReclaimer, PortReclaimer};
use super::registry::{DeploymentRegistry, RunningDeployment};

/// Maps identities to their reserved ports and keeps exactly one server
/// process per port.
pub struct DeployLauncher {
    assignments: PortAssignments,
    launch: CommandTemplate,
    timeouts: Timeouts,
    log_dir: PathBuf,
    reclaimer: Arc<dyn PortReclaimer>,
    registry: DeploymentRegistry,
}

impl DeployLauncher {
    pub fn new(
        assignments: PortAssignments,
        launch: CommandTemplate,
        timeouts: Timeouts,
        reclaimer: Arc<dyn PortReclaimer>,
    ) -> Self {
        let registry = DeploymentRegistry::new(assignments.iter());
        Self {
            assignments,
            launch,
            timeouts,
            log_dir: std::env::temp_dir().join("hk-deployments"),
            reclaimer,
            registry,
        }
    }

    /// Directory receiving one `port-<port>.log` per assigned port.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Build a launcher that reclaims ports with the configured external command.
    pub fn from_config(config: &HostConfig, assignments: PortAssignments) -> Self {
        Self::new(
            assignments,
            config.launch.clone(),
            config.timeouts.clone(),
            Arc::new(CommandReclaimer::new(config.reclaim.clone())),
        )
        .with_log_dir(config.log_dir.clone())
    }

    pub fn assignments(&self) -> &PortAssignments {
        &self.assignments
    }

    pub fn port_for(&self, identity: &str) -> Result<u16> {
        self.assignments
            .port_for(identity)
            .ok_or_else(|| HostError::NoPortAssigned(identity.to_string()))
    }

    /// Replace whatever serves `identity`'s port with a fresh server rooted at `path`.
    ///
    /// Unknown identities and bad paths fail before anything is killed. The
    /// port's registry slot stays locked from the stop of the previous process
    /// until the new handle is stored.
    pub async fn deploy(&self, identity: &str, path: &Path) -> Result<DeployOutcome> {
        let port = self.port_for(identity)?;
        let root = resolve_project_path(path).await?;
        let slot = self
            .registry
            .slot(port)
            .ok_or_else(|| HostError::NoPortAssigned(identity.to_string()))?;

        let mut current = slot.lock().await;

        if let Some(previous) = current.take() {
            tracing::info!(port, pid = ?previous.pid, "stopping previous deployment");
            if let Err(e) = previous.stop(self.timeouts.stop()).await {
                tracing::warn!(port, error = %e, "previous deployment did not stop cleanly");
            }
        }

        self.reclaim(port).await?;

        // From here on the port is vacant; a failure leaves it that way.
        let spawned = match tokio::time::timeout(
            self.timeouts.spawn(),
            process::start(&self.launch, port, &root, identity, &self.log_dir),
        )
        .await
        {
            Ok(Ok(spawned)) => spawned,
            Ok(Err(e)) => return Err(left_vacant(port, e)),
            Err(_) => {
                return Err(HostError::Launch(format!(
                    "spawn did not complete within {}ms; port {port} left vacant",
                    self.timeouts.spawn_ms
                )))
            }
        };

        let mut deployment = RunningDeployment::new(identity, port, root, spawned);
        self.confirm_startup(&mut deployment).await?;

        let outcome = DeployOutcome {
            port,
            pid: deployment.pid,
        };
        tracing::info!(
            identity,
            port,
            pid = ?deployment.pid,
            root = %deployment.root.display(),
            log = %deployment.log_path().display(),
            "deployment launched"
        );
        *current = Some(deployment);
        Ok(outcome)
    }

    /// Stop the registered process on `identity`'s port. Returns whether one was running.
    pub async fn stop(&self, identity: &str) -> Result<bool> {
        let port = self.port_for(identity)?;
        let Some(slot) = self.registry.slot(port) else {
            return Ok(false);
        };
        let taken = slot.lock().await.take();
        match taken {
            Some(deployment) => {
                deployment.stop(self.timeouts.stop()).await?;
                tracing::info!(identity, port, "deployment stopped");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn deployments(&self) -> Vec<DeploymentInfo> {
        self.registry.snapshot()
    }

    /// Stop every process this launcher started.
    pub async fn shutdown(&self) {
        self.registry.stop_all(self.timeouts.stop()).await;
    }

    async fn reclaim(&self, port: u16) -> Result<()> {
        match tokio::time::timeout(self.timeouts.reclaim(), self.reclaimer.reclaim(port)).await {
            Ok(Ok(outcome)) => {
                tracing::debug!(port, ?outcome, "port reclaimed");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::warn!(port, error = %e, "port reclaim failed, continuing");
                Ok(())
            }
            Err(_) => Err(HostError::Launch(format!(
                "reclaiming port {port} did not finish within {}ms",
                self.timeouts.reclaim_ms
            ))),
        }
    }

    async fn confirm_startup(&self, deployment: &mut RunningDeployment) -> Result<()> {
        let grace = self.timeouts.startup_grace();
        if grace.is_zero() {
            return Ok(());
        }
        tokio::time::sleep(grace).await;
        if let DeploymentStatus::Exited { code } = deployment.status() {
            let code = code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
            return Err(HostError::Launch(format!(
                "server on port {} exited during startup with {code}; port left vacant",
                deployment.port
            )));
        }
        Ok(())
    }
}

/// Canonicalize a project path, requiring an existing directory.
pub async fn resolve_project_path(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(HostError::invalid_path(path, "path is empty"));
    }
    let resolved = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| HostError::invalid_path(path, e.to_string()))?;
    let metadata = tokio::fs::metadata(&resolved)
        .await
        .map_err(|e| HostError::invalid_path(path, e.to_string()))?;
    if !metadata.is_dir() {
        return Err(HostError::invalid_path(path, "not a directory"));
    }
    Ok(resolved)
}

fn left_vacant(port: u16, error: HostError) -> HostError {
    match error {
        HostError::Launch(msg) => HostError::Launch(format!("{msg}; port {port} left vacant")),
        other => other,
    }
}
