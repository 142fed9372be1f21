pub mod assignment;
pub mod config;
pub mod deployment;
pub mod project;

pub use assignment::PortAssignments;
pub use config::{CommandTemplate, HostConfig, Timeouts};
pub use deployment::{DeployOutcome, DeploymentInfo, DeploymentStatus};
pub use project::{DirectoryEntry, UploadedFile};
