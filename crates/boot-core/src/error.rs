use boot_exec::ExecError;
use boot_health::HealthError;
use boot_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootError {
    #[error("config: {0}")]
    Model(#[from] ModelError),

    #[error("{0}")]
    Config(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot allocate a port on {host}: {source}")]
    Port {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("random source unavailable: {0}")]
    Random(String),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Health(#[from] HealthError),

    #[error("{0}: exited while the cluster was running")]
    Exited(String),

    #[error("task {task} failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<BootError>,
    },

    #[error("no such task: {0}")]
    UnknownTask(String),

    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("supervisor task aborted: {0}")]
    Aborted(String),

    #[error("context canceled")]
    Cancelled,
}

impl BootError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BootError::Io {
            context: context.into(),
            source,
        }
    }

    /// True for cancellation, however deep it was raised.
    pub fn is_cancelled(&self) -> bool {
        match self {
            BootError::Cancelled => true,
            BootError::Exec(e) => e.is_cancelled(),
            BootError::Health(HealthError::Cancelled) => true,
            _ => false,
        }
    }
}
