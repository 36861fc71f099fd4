use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?} (want text, json or journald)")]
    InvalidFormat(String),
    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),
    #[error("journald output needs Linux and the `journald` feature")]
    JournaldNotSupported,
    #[error("journald: {0}")]
    Journald(String),
    #[error("logger already initialized")]
    AlreadyInitialized,
    #[error("cannot initialize logger: {0}")]
    InitializationFailed(String),
}

impl LoggerError {
    /// Classify a `try_init` failure; a second global subscriber is the common case.
    pub(crate) fn from_init(e: impl std::fmt::Display) -> Self {
        let msg = e.to_string();
        if msg.contains("global default") {
            LoggerError::AlreadyInitialized
        } else {
            LoggerError::InitializationFailed(msg)
        }
    }
}
