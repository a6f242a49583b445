//! Integration tests for logging setup

use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, strip_path, LogFormat, LoggingConfig};

#[test]
fn test_init_logging_only_once() {
    // The global subscriber is process-wide, so this is the only test that
    // installs one
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn);
    init_logging(config.clone()).unwrap();

    tracing::warn!(root = "/mnt/usb/Books", "Logging ready");
    assert!(init_logging(config).is_err());
}

#[test]
fn test_invalid_filter_is_config_error() {
    let config = LoggingConfig::default().with_filter("core_scan=loudest");
    assert!(matches!(
        init_logging(config),
        Err(core_runtime::Error::Config(_))
    ));
}

#[test]
fn test_defaults() {
    let config = LoggingConfig::default();
    assert!(config.redact_locations);
    assert!(config.logger_sink.is_none());
    assert!(config.filter.is_none());
    assert_eq!(config.level, LogLevel::Info);
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/mnt/usb/Books"), "Books");
    assert_eq!(strip_path("C:\\Users\\Jo\\Audiobooks\\Dune"), "Dune");
    assert_eq!(
        strip_path("content://com.android.externalstorage.documents/tree/primary%3AAudiobooks%2FDune"),
        "Dune"
    );
    assert_eq!(strip_path("cover.jpg"), "cover.jpg");
    assert_eq!(strip_path(""), "");
}
