use is_terminal::IsTerminal;

use crate::logger::{error::LoggerError, format::LoggerFormat, level::LoggerLevel};

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: LoggerLevel,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stderr().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: LoggerLevel::default(),
            with_targets: true,
            use_color,
        }
    }
}

impl LoggerConfig {
    /// Build from a cluster's `SystemLogs` section.
    ///
    /// `debug_override` is the value of the host's debug switch (`ARVADOS_DEBUG`);
    /// anything other than empty or `"0"` forces the `debug` level.
    pub fn from_system_logs(
        format: &str,
        level: &str,
        debug_override: Option<&str>,
    ) -> Result<Self, LoggerError> {
        let level = match debug_override {
            Some(v) if !v.is_empty() && v != "0" => "debug",
            _ if level.trim().is_empty() => "info",
            _ => level,
        };
        Ok(Self {
            format: format.parse()?,
            level: LoggerLevel::new(level)?,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_logs_mapping() {
        let cfg = LoggerConfig::from_system_logs("json", "warning", None).unwrap();
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.level.as_str(), "warn");

        let cfg = LoggerConfig::from_system_logs("text", "", None).unwrap();
        assert_eq!(cfg.level.as_str(), "info");
    }

    #[test]
    fn debug_override_wins_unless_zero() {
        let cfg = LoggerConfig::from_system_logs("text", "info", Some("1")).unwrap();
        assert_eq!(cfg.level.as_str(), "debug");

        let cfg = LoggerConfig::from_system_logs("text", "info", Some("0")).unwrap();
        assert_eq!(cfg.level.as_str(), "info");

        let cfg = LoggerConfig::from_system_logs("text", "info", Some("")).unwrap();
        assert_eq!(cfg.level.as_str(), "info");
    }

    #[test]
    fn bad_format_is_reported() {
        assert!(LoggerConfig::from_system_logs("xml", "info", None).is_err());
    }
}
