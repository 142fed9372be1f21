use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{DeploymentInfo, DeploymentStatus};

use super::process::{self, SpawnedProcess};

/// A process the launcher started and still holds a handle to.
pub struct RunningDeployment {
    pub identity: String,
    pub port: u16,
    pub root: PathBuf,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    process: SpawnedProcess,
}

impl RunningDeployment {
    pub fn new(identity: &str, port: u16, root: PathBuf, process: SpawnedProcess) -> Self {
        Self {
            identity: identity.to_string(),
            port,
            root,
            pid: process.child.id(),
            started_at: Utc::now(),
            process,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.process.log_path
    }

    /// Probe the child without blocking.
    pub fn status(&mut self) -> DeploymentStatus {
        match self.process.child.try_wait() {
            Ok(None) => DeploymentStatus::Running,
            Ok(Some(status)) => DeploymentStatus::Exited {
                code: status.code(),
            },
            Err(e) => {
                tracing::warn!(port = self.port, error = %e, "failed to probe deployment");
                DeploymentStatus::Exited { code: None }
            }
        }
    }

    pub fn info(&mut self) -> DeploymentInfo {
        DeploymentInfo {
            identity: self.identity.clone(),
            port: self.port,
            root: Some(self.root.clone()),
            pid: self.pid,
            started_at: Some(self.started_at),
            log_path: Some(self.process.log_path.clone()),
            status: self.status(),
        }
    }

    pub async fn stop(mut self, grace: Duration) -> Result<()> {
        process::stop(&mut self.process.child, grace).await
    }
}

/// The registry slot for one port. Holding its lock is what serializes
/// deploys for the identity owning that port.
pub type DeploymentSlot = Arc<Mutex<Option<RunningDeployment>>>;

struct PortSlot {
    identity: String,
    slot: DeploymentSlot,
}

/// Port -> running process, with one slot per assigned port created up front.
pub struct DeploymentRegistry {
    slots: BTreeMap<u16, PortSlot>,
}

impl DeploymentRegistry {
    pub fn new<I, S>(assignments: I) -> Self
    where
        I: IntoIterator<Item = (S, u16)>,
        S: Into<String>,
    {
        Self {
            slots: assignments
                .into_iter()
                .map(|(identity, port)| {
                    let entry = PortSlot {
                        identity: identity.into(),
                        slot: Arc::new(Mutex::new(None)),
                    };
                    (port, entry)
                })
                .collect(),
        }
    }

    pub fn slot(&self, port: u16) -> Option<DeploymentSlot> {
        self.slots.get(&port).map(|entry| entry.slot.clone())
    }

    /// Snapshot of every occupied slot, in port order.
    ///
    /// Never waits on a slot: one locked by an in-flight deploy is reported
    /// as `Deploying`.
    pub fn snapshot(&self) -> Vec<DeploymentInfo> {
        let mut infos = Vec::new();
        for (&port, entry) in &self.slots {
            match entry.slot.try_lock() {
                Ok(mut guard) => {
                    if let Some(deployment) = guard.as_mut() {
                        infos.push(deployment.info());
                    }
                }
                Err(_) => infos.push(DeploymentInfo::deploying(&entry.identity, port)),
            }
        }
        infos
    }

    /// Stop every registered process.
    pub async fn stop_all(&self, grace: Duration) {
        for (port, entry) in &self.slots {
            let taken = entry.slot.lock().await.take();
            if let Some(deployment) = taken {
                if let Err(e) = deployment.stop(grace).await {
                    tracing::warn!(port, error = %e, "failed to stop deployment");
                }
            }
        }
    }
}
