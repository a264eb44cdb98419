use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Gateway(#[from] kocom_gateway::GatewayError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("invalid argument {0:?}: expected key=value")]
    InvalidArgument(String),

    #[error("command was not confirmed")]
    NotConfirmed,
}

pub type RunnerResult<T> = Result<T, RunnerError>;
