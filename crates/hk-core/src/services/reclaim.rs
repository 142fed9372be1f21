use async_trait::async_trait;
use tokio::process::Command;

use crate::error::Result;
use crate::models::CommandTemplate;

/// What happened when a port was reclaimed from an external occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimOutcome {
    Killed,
    NoOccupant,
    /// The reclaim facility itself was unavailable.
    Skipped,
}

/// Frees a TCP port from whatever process currently holds it.
///
/// Best-effort: an empty port or an unavailable kill facility is not an error.
#[async_trait]
pub trait PortReclaimer: Send + Sync {
    async fn reclaim(&self, port: u16) -> Result<ReclaimOutcome>;
}

/// Reclaims a port by running an external command, `fuser -k <port>/tcp` by default.
pub struct CommandReclaimer {
    template: CommandTemplate,
}

impl CommandReclaimer {
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }
}

#[async_trait]
impl PortReclaimer for CommandReclaimer {
    async fn reclaim(&self, port: u16) -> Result<ReclaimOutcome> {
        let args = self.template.render_args(port, None);
        let output = match Command::new(&self.template.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    port,
                    program = %self.template.program,
                    error = %e,
                    "could not run reclaim command"
                );
                return Ok(ReclaimOutcome::Skipped);
            }
        };

        if output.status.success() {
            tracing::info!(port, "killed previous occupant of port");
            Ok(ReclaimOutcome::Killed)
        } else {
            // fuser exits 1 when nothing holds the port
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(
                port,
                exit = output.status.code().unwrap_or(-1),
                stderr = %stderr.trim(),
                "no occupant reclaimed"
            );
            Ok(ReclaimOutcome::NoOccupant)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_reports_killed() {
        let reclaimer = CommandReclaimer::new(CommandTemplate::new("true", &["{port}/tcp"]));
        assert_eq!(reclaimer.reclaim(8001).await.unwrap(), ReclaimOutcome::Killed);
    }

    #[tokio::test]
    async fn failing_command_reports_no_occupant() {
        let reclaimer = CommandReclaimer::new(CommandTemplate::new("false", &[]));
        assert_eq!(
            reclaimer.reclaim(8001).await.unwrap(),
            ReclaimOutcome::NoOccupant
        );
    }

    #[tokio::test]
    async fn missing_program_is_skipped() {
        let reclaimer = CommandReclaimer::new(CommandTemplate::new("hk-no-such-fuser", &[]));
        assert_eq!(reclaimer.reclaim(8001).await.unwrap(), ReclaimOutcome::Skipped);
    }
}
