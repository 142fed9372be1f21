use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// A program plus argument vector with `{port}` and `{path}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Substitute placeholders in every argument. `{path}` is left untouched
    /// when no path is given.
    pub fn render_args(&self, port: u16, path: Option<&Path>) -> Vec<String> {
        let port = port.to_string();
        let path = path.map(|p| p.to_string_lossy().to_string());
        self.args
            .iter()
            .map(|arg| {
                let arg = arg.replace("{port}", &port);
                match &path {
                    Some(p) => arg.replace("{path}", p),
                    None => arg,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub reclaim_ms: u64,
    pub spawn_ms: u64,
    pub stop_ms: u64,
    /// How long to watch a fresh process before reporting success. Zero skips the check.
    pub startup_grace_ms: u64,
}

impl Timeouts {
    pub fn reclaim(&self) -> Duration {
        Duration::from_millis(self.reclaim_ms)
    }

    pub fn spawn(&self) -> Duration {
        Duration::from_millis(self.spawn_ms)
    }

    pub fn stop(&self) -> Duration {
        Duration::from_millis(self.stop_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            reclaim_ms: 5_000,
            spawn_ms: 5_000,
            stop_ms: 3_000,
            startup_grace_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub projects_root: PathBuf,
    /// Deployed servers append their stdout and stderr to `port-<port>.log` here.
    pub log_dir: PathBuf,
    pub launch: CommandTemplate,
    pub reclaim: CommandTemplate,
    pub timeouts: Timeouts,
    pub stop_on_shutdown: bool,
    pub max_upload_bytes: usize,
    /// Raw table from the file; validated into `PortAssignments` by the loader.
    pub port_assignments: BTreeMap<String, u16>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            projects_root: PathBuf::from("."),
            log_dir: PathBuf::from("logs"),
            launch: CommandTemplate::new("flet", &["run", "--web", "--port", "{port}", "{path}"]),
            reclaim: CommandTemplate::new("fuser", &["-k", "{port}/tcp"]),
            timeouts: Timeouts::default(),
            stop_on_shutdown: false,
            max_upload_bytes: 64 * 1024 * 1024,
            port_assignments: BTreeMap::new(),
        }
    }
}
