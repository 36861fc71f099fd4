use std::{fmt, str::FromStr};

use tracing_subscriber::EnvFilter;

use crate::logger::error::LoggerError;

/// Validated filter directive (`"info"`, `"debug"`, `"boot.exec=trace,info"`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerLevel(String);

impl LoggerLevel {
    pub fn new(level: impl Into<String>) -> Result<Self, LoggerError> {
        let level = level.into();
        let norm = level.trim().to_ascii_lowercase();
        // Cluster configs spell the quiet level "warning".
        let norm = if norm == "warning" { "warn".to_string() } else { norm };
        if norm.is_empty() {
            return Err(LoggerError::InvalidLogLevel(level));
        }
        EnvFilter::try_new(&norm).map_err(|_| LoggerError::InvalidLogLevel(level))?;
        Ok(Self(norm))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn filter(&self) -> Result<EnvFilter, LoggerError> {
        EnvFilter::try_new(&self.0).map_err(|_| LoggerError::InvalidLogLevel(self.0.clone()))
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for LoggerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
