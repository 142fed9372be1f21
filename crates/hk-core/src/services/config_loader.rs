use std::ffi::OsString;
use std::path::Path;

use crate::error::{HostError, Result};
use crate::models::assignment::ENV_PREFIX;
use crate::models::{HostConfig, PortAssignments};

pub const CONFIG_FILENAME: &str = "hk-server.yaml";

/// Read and validate a config file.
pub fn load(config_path: &Path) -> Result<HostConfig> {
    if !config_path.exists() {
        return Err(HostError::ConfigNotFound(config_path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(config_path)?;
    let config: HostConfig = if contents.trim().is_empty() {
        HostConfig::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|e| HostError::InvalidConfig(e.to_string()))?
    };
    validate(&config)?;
    Ok(config)
}

/// Use an explicit path if given (it must exist), otherwise look for
/// `hk-server.yaml` in `working_directory` and fall back to defaults.
pub fn discover(explicit: Option<&Path>, working_directory: &Path) -> Result<HostConfig> {
    if let Some(path) = explicit {
        return load(path);
    }
    match load(&working_directory.join(CONFIG_FILENAME)) {
        Ok(config) => Ok(config),
        Err(HostError::ConfigNotFound(path)) => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(HostConfig::default())
        }
        Err(e) => Err(e),
    }
}

/// Build the port table from the config file entries plus `EMAIL_PORT_*`
/// environment entries.
pub fn resolve_assignments<I, K, V>(config: &HostConfig, env: I) -> Result<PortAssignments>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let from_file = PortAssignments::from_pairs(
        config
            .port_assignments
            .iter()
            .map(|(identity, &port)| (identity.clone(), port)),
    )?;
    let from_env = PortAssignments::from_env_vars(env)?;
    from_file.merge(from_env)
}

/// Keep the Unicode entries of an OS environment, e.g. `std::env::vars_os()`.
///
/// Other entries are skipped, except that a port assignment which is not valid
/// Unicode is an error rather than a silently missing mapping.
pub fn unicode_env_vars<I>(vars: I) -> Result<Vec<(String, String)>>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut entries = Vec::new();
    for (key, value) in vars {
        match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => entries.push((key, value)),
            (key, _) => {
                let key = match key {
                    Ok(key) => key,
                    Err(raw) => raw.to_string_lossy().into_owned(),
                };
                if key.starts_with(ENV_PREFIX) {
                    return Err(HostError::InvalidConfig(format!(
                        "environment entry {key} is not valid Unicode"
                    )));
                }
                tracing::debug!(key, "skipping non-Unicode environment entry");
            }
        }
    }
    Ok(entries)
}

fn validate(config: &HostConfig) -> Result<()> {
    if config.launch.program.trim().is_empty() {
        return Err(HostError::InvalidConfig("launch.program is required".into()));
    }
    if config.reclaim.program.trim().is_empty() {
        return Err(HostError::InvalidConfig("reclaim.program is required".into()));
    }
    let t = &config.timeouts;
    if t.reclaim_ms == 0 || t.spawn_ms == 0 || t.stop_ms == 0 {
        return Err(HostError::InvalidConfig(
            "timeouts.reclaim_ms, spawn_ms and stop_ms must be positive".into(),
        ));
    }
    if config.max_upload_bytes == 0 {
        return Err(HostError::InvalidConfig(
            "max_upload_bytes must be positive".into(),
        ));
    }
    Ok(())
}
