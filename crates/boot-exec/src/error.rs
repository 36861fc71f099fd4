use std::process::ExitStatus;

use thiserror::Error;

pub type ExecResult<T> = Result<T, ExecError>;

/// Every variant except [`ExecError::Cancelled`] names the command line that failed.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("{cmdline}: spawn failed: {source}")]
    Spawn {
        cmdline: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{cmdline}: wait failed: {source}")]
    Wait {
        cmdline: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{cmdline}: copying output failed: {source}")]
    Output {
        cmdline: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{cmdline}: error: {status}")]
    Failed { cmdline: String, status: ExitStatus },
    #[error("context canceled")]
    Cancelled,
}

impl ExecError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled)
    }
}
