use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the caller learns from a deploy: the port, and the pid when the
/// platform reports one. Launch was initiated; health is not implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeployOutcome {
    pub port: u16,
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum DeploymentStatus {
    /// A deploy holds the slot right now; the previous process may already be gone.
    Deploying,
    Running,
    Exited {
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<i32>,
    },
}

/// Registry snapshot of one port. `root`, `pid`, `started_at` and `log_path`
/// are absent while the slot is [`DeploymentStatus::Deploying`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    pub identity: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    pub status: DeploymentStatus,
}

impl DeploymentInfo {
    pub fn deploying(identity: impl Into<String>, port: u16) -> Self {
        Self {
            identity: identity.into(),
            port,
            root: None,
            pid: None,
            started_at: None,
            log_path: None,
            status: DeploymentStatus::Deploying,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == DeploymentStatus::Running
    }
}
