//! Unit tests for OpenGL debug message classification
//!
//! The sink is driven directly with raw GL enums, no context required.

use super::*;
use lumen_render::lumen::render::{Config, DebugMessageFilter};
use serial_test::serial;

fn sink(config: Config) -> Arc<DebugMessageSink> {
    DebugMessageSink::new("lumen::opengl", config.debug_sink_config())
}

fn stats_config() -> Config {
    Config {
        enable_validation_stats: true,
        debug_severity: DebugSeverity::All,
        ..Config::default()
    }
}

#[test]
fn test_severity_mapping() {
    assert_eq!(message_level(glow::DEBUG_SEVERITY_HIGH), DebugMessageLevel::Error);
    assert_eq!(message_level(glow::DEBUG_SEVERITY_MEDIUM), DebugMessageLevel::Warning);
    assert_eq!(message_level(glow::DEBUG_SEVERITY_LOW), DebugMessageLevel::Warning);
    assert_eq!(message_level(glow::DEBUG_SEVERITY_NOTIFICATION), DebugMessageLevel::Info);
    assert_eq!(message_level(0), DebugMessageLevel::Verbose);
}

#[test]
fn test_category_mapping() {
    assert_eq!(message_category(glow::DEBUG_TYPE_ERROR), DebugMessageCategory::Validation);
    assert_eq!(
        message_category(glow::DEBUG_TYPE_UNDEFINED_BEHAVIOR),
        DebugMessageCategory::Validation
    );
    assert_eq!(message_category(glow::DEBUG_TYPE_PERFORMANCE), DebugMessageCategory::Performance);
    assert_eq!(message_category(glow::DEBUG_TYPE_MARKER), DebugMessageCategory::General);
    assert_eq!(message_category(glow::DEBUG_TYPE_OTHER), DebugMessageCategory::General);
}

#[test]
fn test_origin_mapping() {
    assert_eq!(message_origin(glow::DEBUG_SOURCE_API), "API");
    assert_eq!(message_origin(glow::DEBUG_SOURCE_SHADER_COMPILER), "Shader Compiler");
    assert_eq!(message_origin(glow::DEBUG_SOURCE_OTHER), "Other");
}

#[test]
#[serial]
fn test_ignored_ids_are_dropped() {
    let sink = sink(stats_config());
    for id in [131169, 131185, 131218, 131204] {
        assert!(!report_gl_message(
            &sink,
            glow::DEBUG_SOURCE_API,
            glow::DEBUG_TYPE_OTHER,
            id,
            glow::DEBUG_SEVERITY_NOTIFICATION,
            "buffer info"
        ));
    }
    assert_eq!(sink.stats().total(), 0);
}

#[test]
#[serial]
fn test_messages_are_counted_per_level() {
    let sink = sink(stats_config());
    report_gl_message(&sink, glow::DEBUG_SOURCE_API, glow::DEBUG_TYPE_ERROR, 1, glow::DEBUG_SEVERITY_HIGH, "invalid enum");
    report_gl_message(&sink, glow::DEBUG_SOURCE_API, glow::DEBUG_TYPE_PERFORMANCE, 2, glow::DEBUG_SEVERITY_MEDIUM, "slow path");
    report_gl_message(&sink, glow::DEBUG_SOURCE_API, glow::DEBUG_TYPE_OTHER, 3, glow::DEBUG_SEVERITY_NOTIFICATION, "note");

    let stats = sink.stats();
    assert_eq!((stats.errors, stats.warnings, stats.info), (1, 1, 1));
    assert!(stats.has_errors());
}

#[test]
#[serial]
fn test_category_filter() {
    let sink = sink(Config {
        debug_message_filter: DebugMessageFilter {
            show_performance: false,
            ..DebugMessageFilter::default()
        },
        ..stats_config()
    });

    assert!(!report_gl_message(
        &sink,
        glow::DEBUG_SOURCE_API,
        glow::DEBUG_TYPE_PERFORMANCE,
        9,
        glow::DEBUG_SEVERITY_MEDIUM,
        "redundant state change"
    ));
    assert!(report_gl_message(
        &sink,
        glow::DEBUG_SOURCE_API,
        glow::DEBUG_TYPE_ERROR,
        10,
        glow::DEBUG_SEVERITY_HIGH,
        "invalid operation"
    ));
}

#[test]
#[serial]
#[should_panic(expected = "panic_on_error")]
fn test_panic_on_error() {
    let sink = sink(Config {
        panic_on_error: true,
        ..stats_config()
    });
    report_gl_message(&sink, glow::DEBUG_SOURCE_API, glow::DEBUG_TYPE_ERROR, 1282, glow::DEBUG_SEVERITY_HIGH, "GL_INVALID_OPERATION");
    assert!(sink.has_deferred());
    sink.raise_deferred();
}

#[test]
fn test_stats_report_does_not_panic() {
    print_validation_stats_report(&ValidationStats::default());
    print_validation_stats_report(&ValidationStats {
        errors: 1,
        warnings: 2,
        info: 3,
        verbose: 4,
    });
}
