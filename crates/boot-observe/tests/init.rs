use boot_observe::{LoggerConfig, LoggerError, init_logger};

#[test]
fn second_init_reports_already_initialized() {
    let cfg = LoggerConfig::default();
    init_logger(&cfg).unwrap();
    tracing::info!(target: "boot.observe.test", "logger up");

    assert!(matches!(
        init_logger(&cfg),
        Err(LoggerError::AlreadyInitialized | LoggerError::InitializationFailed(_))
    ));
}
