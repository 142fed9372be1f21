use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("no port assigned to identity '{0}'")]
    NoPortAssigned(String),

    #[error("config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid project path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("launch failed: {0}")]
    Launch(String),

    #[error("project '{0}' already exists")]
    ProjectExists(String),

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Coarse classification used at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operator action needed (missing port mapping, bad config).
    Configuration,
    /// Caller supplied something unusable; retryable after correcting input.
    Input,
    /// Process or environment failure.
    Environment,
}

impl HostError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoPortAssigned(_) | Self::ConfigNotFound(_) | Self::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            Self::InvalidPath { .. }
            | Self::ProjectExists(_)
            | Self::NotFound(_)
            | Self::InvalidName(_)
            | Self::Json(_) => ErrorKind::Input,
            Self::Launch(_) | Self::Io(_) | Self::Yaml(_) => ErrorKind::Environment,
        }
    }

    pub(crate) fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
