//! Subscriber assembly. Every format writes to stderr, leaving stdout to the caller.

use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::Subscriber;
use tracing_subscriber::{
    Layer, fmt, fmt::time::OffsetTime, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let base = tracing_subscriber::registry().with(cfg.level.filter()?);
    match cfg.format {
        LoggerFormat::Text => base.with(text_layer(cfg)).try_init(),
        LoggerFormat::Json => base.with(json_layer(cfg)).try_init(),
        LoggerFormat::Journald => return journald(base),
    }
    .map_err(LoggerError::from_init)
}

fn text_layer<S>(cfg: &LoggerConfig) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg.use_color)
        .with_target(cfg.with_targets)
        .with_timer(local_rfc3339())
}

fn json_layer<S>(cfg: &LoggerConfig) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_writer(std::io::stderr)
        .with_target(cfg.with_targets)
        .with_timer(local_rfc3339())
}

/// Local time when the offset can be determined (single-threaded start-up), else UTC.
fn local_rfc3339() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald<S>(base: S) -> Result<(), LoggerError>
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
{
    let layer = tracing_journald::layer().map_err(|e| LoggerError::Journald(e.to_string()))?;
    base.with(layer).try_init().map_err(LoggerError::from_init)
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald<S>(_base: S) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
