use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

use crate::error::{HostError, Result};
use crate::models::CommandTemplate;

/// A launched server process and the file its output goes to.
pub struct SpawnedProcess {
    pub child: Child,
    pub log_path: PathBuf,
}

/// Where the server on `port` writes its stdout and stderr.
pub fn log_path_for(log_dir: &Path, port: u16) -> PathBuf {
    log_dir.join(format!("port-{port}.log"))
}

/// Spawn the server command for `port`, rooted at `root`.
///
/// The child gets its own process group so that everything it forks can be
/// signalled together. Its stdout and stderr are appended to a per-port file
/// in `log_dir` rather than piped, so the process keeps running after the
/// host exits.
pub async fn start(
    template: &CommandTemplate,
    port: u16,
    root: &Path,
    identity: &str,
    log_dir: &Path,
) -> Result<SpawnedProcess> {
    let args = template.render_args(port, Some(root));
    let log_path = log_path_for(log_dir, port);
    let (stdout, stderr) = open_log(&log_path, identity, root).await?;

    let mut cmd = Command::new(&template.program);
    cmd.args(&args);
    cmd.current_dir(root);
    cmd.stdin(Stdio::null());
    cmd.stdout(stdout);
    cmd.stderr(stderr);
    cmd.kill_on_drop(false);
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|e| {
        HostError::Launch(format!("failed to spawn {}: {e}", template.program))
    })?;
    tracing::debug!(port, identity, log = %log_path.display(), "server output redirected");

    Ok(SpawnedProcess { child, log_path })
}

async fn open_log(log_path: &Path, identity: &str, root: &Path) -> Result<(Stdio, Stdio)> {
    let launch_error =
        |e: std::io::Error| HostError::Launch(format!("log file {}: {e}", log_path.display()));

    if let Some(dir) = log_path.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(launch_error)?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .await
        .map_err(launch_error)?;
    let header = format!(
        "--- {} deploy for {identity} from {} ---\n",
        chrono::Utc::now().to_rfc3339(),
        root.display()
    );
    file.write_all(header.as_bytes())
        .await
        .map_err(launch_error)?;
    file.flush().await.map_err(launch_error)?;

    let file = file.into_std().await;
    let stderr = file.try_clone().map_err(launch_error)?;
    Ok((Stdio::from(file), Stdio::from(stderr)))
}

/// Stop a child: SIGTERM to its group, wait up to `grace`, then SIGKILL.
pub async fn stop(child: &mut Child, grace: Duration) -> Result<()> {
    if let Ok(Some(_)) = child.try_wait() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            signal_group(pid, libc::SIGTERM);
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(_)) => return Ok(()),
                Ok(Err(e)) => {
                    return Err(HostError::Launch(format!(
                        "failed to wait for pid {pid}: {e}"
                    )))
                }
                Err(_) => {
                    tracing::warn!(
                        pid,
                        grace_ms = grace.as_millis() as u64,
                        "process ignored SIGTERM, killing"
                    );
                    signal_group(pid, libc::SIGKILL);
                }
            }
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    child
        .kill()
        .await
        .map_err(|e| HostError::Launch(format!("failed to kill process: {e}")))?;
    Ok(())
}

/// Whether a pid refers to a running process. Exited but unreaped
/// processes (zombies) count as dead.
#[cfg(unix)]
pub fn is_pid_alive(pid: u32) -> bool {
    if unsafe { libc::kill(pid as i32, 0) } != 0 {
        return false;
    }
    // No procfs (e.g. macOS): signal delivery is the best we can tell.
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => !is_exited_state(&stat),
        Err(_) => true,
    }
}

/// The state field follows the parenthesised command name, which may itself
/// contain spaces or parentheses.
#[cfg(unix)]
fn is_exited_state(stat: &str) -> bool {
    stat.rsplit_once(')')
        .and_then(|(_, rest)| rest.trim_start().chars().next())
        .is_some_and(|state| matches!(state, 'Z' | 'X' | 'x'))
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    unsafe {
        libc::kill(-(pid as i32), signal);
    }
}
