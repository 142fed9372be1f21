// Each test binary compiles this module independently and uses a different
// subset of helpers, so unused-function warnings are expected.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Child;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use hk_core::error::{HostError, Result};
use hk_core::models::{CommandTemplate, PortAssignments, Timeouts};
use hk_core::services::launcher::DeployLauncher;
use hk_core::services::reclaim::{PortReclaimer, ReclaimOutcome};

/// Records every reclaim request and kills the fake occupants registered for that port.
#[derive(Default)]
pub struct RecordingReclaimer {
    calls: Mutex<Vec<u16>>,
    occupants: Mutex<HashMap<u16, Vec<Child>>>,
}

impl RecordingReclaimer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<u16> {
        self.calls.lock().unwrap().clone()
    }

    /// Start a `sleep` process that stands in for whatever currently holds `port`.
    pub fn occupy(&self, port: u16) -> u32 {
        let child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        let pid = child.id();
        self.occupants
            .lock()
            .unwrap()
            .entry(port)
            .or_default()
            .push(child);
        pid
    }
}

#[async_trait]
impl PortReclaimer for RecordingReclaimer {
    async fn reclaim(&self, port: u16) -> Result<ReclaimOutcome> {
        self.calls.lock().unwrap().push(port);
        let victims = self.occupants.lock().unwrap().remove(&port);
        match victims {
            Some(children) => {
                for mut child in children {
                    let _ = child.kill();
                    let _ = child.wait();
                }
                Ok(ReclaimOutcome::Killed)
            }
            None => Ok(ReclaimOutcome::NoOccupant),
        }
    }
}

/// A reclaimer that never finishes in time.
pub struct StalledReclaimer;

#[async_trait]
impl PortReclaimer for StalledReclaimer {
    async fn reclaim(&self, _port: u16) -> Result<ReclaimOutcome> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(ReclaimOutcome::Killed)
    }
}

/// A reclaimer whose underlying facility errors out.
pub struct BrokenReclaimer;

#[async_trait]
impl PortReclaimer for BrokenReclaimer {
    async fn reclaim(&self, _port: u16) -> Result<ReclaimOutcome> {
        Err(HostError::Launch("fuser: permission denied".into()))
    }
}

pub fn assignments() -> PortAssignments {
    PortAssignments::from_pairs(vec![
        ("alice@example.com", 8001),
        ("carol@example.com", 8003),
    ])
    .unwrap()
}

pub fn test_timeouts() -> Timeouts {
    Timeouts {
        reclaim_ms: 500,
        spawn_ms: 2_000,
        stop_ms: 2_000,
        startup_grace_ms: 0,
    }
}

pub fn sleeper() -> CommandTemplate {
    CommandTemplate::new("sleep", &["30"])
}

/// A launcher whose "server" is `sleep 30`.
pub fn launcher(reclaimer: Arc<dyn PortReclaimer>) -> DeployLauncher {
    DeployLauncher::new(assignments(), sleeper(), test_timeouts(), reclaimer)
}

/// Create `<tmp>/<identity>/app` and return the temp dir guard plus the path.
pub fn project_dir(owner: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(owner).join("app");
    std::fs::create_dir_all(&path).unwrap();
    (dir, path)
}
