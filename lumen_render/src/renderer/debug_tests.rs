//! Unit tests for debug-message filtering and statistics

use crate::log::LogSeverity;
use crate::renderer::{
    log_severity, format_message, DebugMessage, DebugMessageCategory, DebugMessageFilter,
    DebugMessageLevel, DebugMessageSink, DebugOutput, DebugSeverity, DebugSinkConfig,
    ValidationStats, ValidationStatsTracker,
};

fn file_sink(name: &str, severity: DebugSeverity) -> (std::sync::Arc<DebugMessageSink>, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("lumen_debug_{}_{}.log", name, std::process::id()));
    let _ = std::fs::remove_file(&path);
    let sink = DebugMessageSink::new(
        "lumen::test",
        DebugSinkConfig {
            severity,
            output: DebugOutput::File(path.to_string_lossy().into_owned()),
            message_filter: DebugMessageFilter::default(),
            ignored_ids: vec![131169, 131185, 131218, 131204],
            break_on_error: false,
            panic_on_error: false,
            enable_stats: true,
        },
    );
    (sink, path)
}

fn message(id: u32, level: DebugMessageLevel, category: DebugMessageCategory) -> DebugMessage<'static> {
    DebugMessage {
        id,
        level,
        category,
        origin: "API",
        text: "GL_INVALID_OPERATION in glDrawElements\n",
    }
}

// ============================================================================
// SEVERITY AND CATEGORY FILTERS
// ============================================================================

#[test]
fn test_debug_severity_thresholds() {
    assert!(DebugSeverity::ErrorsOnly.allows(DebugMessageLevel::Error));
    assert!(!DebugSeverity::ErrorsOnly.allows(DebugMessageLevel::Warning));

    assert!(DebugSeverity::ErrorsAndWarnings.allows(DebugMessageLevel::Warning));
    assert!(!DebugSeverity::ErrorsAndWarnings.allows(DebugMessageLevel::Info));

    assert!(DebugSeverity::All.allows(DebugMessageLevel::Verbose));
}

#[test]
fn test_message_filter_categories() {
    let filter = DebugMessageFilter {
        show_general: false,
        show_validation: true,
        show_performance: false,
    };
    assert!(filter.allows(DebugMessageCategory::Validation));
    assert!(!filter.allows(DebugMessageCategory::General));
    assert!(!filter.allows(DebugMessageCategory::Performance));
}

#[test]
fn test_debug_output_destinations() {
    assert_eq!(DebugOutput::Console.file_path(), None);
    assert!(DebugOutput::Console.to_console());
    assert_eq!(DebugOutput::File("a.log".into()).file_path(), Some("a.log"));
    assert!(!DebugOutput::File("a.log".into()).to_console());
    assert!(DebugOutput::Both("b.log".into()).to_console());
}

#[test]
fn test_log_severity_mapping() {
    assert_eq!(log_severity(DebugMessageLevel::Error), LogSeverity::Error);
    assert_eq!(log_severity(DebugMessageLevel::Warning), LogSeverity::Warn);
    assert_eq!(log_severity(DebugMessageLevel::Info), LogSeverity::Info);
    assert_eq!(log_severity(DebugMessageLevel::Verbose), LogSeverity::Debug);
}

// ============================================================================
// STATS
// ============================================================================

#[test]
fn test_validation_stats_tracker_counts_and_resets() {
    let tracker = ValidationStatsTracker::new();
    tracker.record(DebugMessageLevel::Error);
    tracker.record(DebugMessageLevel::Warning);
    tracker.record(DebugMessageLevel::Warning);
    tracker.record(DebugMessageLevel::Verbose);

    let stats = tracker.snapshot();
    assert_eq!(stats, ValidationStats { errors: 1, warnings: 2, info: 0, verbose: 1 });
    assert_eq!(stats.total(), 4);
    assert!(stats.has_errors());

    tracker.reset();
    assert_eq!(tracker.snapshot().total(), 0);
}

// ============================================================================
// SINK
// ============================================================================

#[test]
fn test_sink_drops_ignored_ids() {
    let (sink, path) = file_sink("ignored", DebugSeverity::All);
    // Buffer detailed info notification, ignored by default
    let reported = sink.report(&message(131185, DebugMessageLevel::Info, DebugMessageCategory::General));
    assert!(!reported);
    assert_eq!(sink.stats().total(), 0);
    assert!(!path.exists());
}

#[test]
fn test_sink_applies_severity_threshold() {
    let (sink, _path) = file_sink("threshold", DebugSeverity::ErrorsOnly);
    assert!(!sink.report(&message(1, DebugMessageLevel::Warning, DebugMessageCategory::Validation)));
    assert!(sink.report(&message(2, DebugMessageLevel::Error, DebugMessageCategory::Validation)));
    assert_eq!(sink.stats().errors, 1);
    assert_eq!(sink.stats().warnings, 0);
}

#[test]
fn test_sink_writes_file_with_repeat_marker() {
    let (sink, path) = file_sink("file", DebugSeverity::All);
    let msg = message(1282, DebugMessageLevel::Warning, DebugMessageCategory::Validation);
    sink.report(&msg);
    sink.report(&msg);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("[WARN ]"));
    assert!(lines[0].contains("[1282] [Validation/API] GL_INVALID_OPERATION"));
    assert!(!lines[0].contains("[x"));
    assert!(lines[1].ends_with("[x2]"));

    sink.reset_stats();
    assert_eq!(sink.stats().total(), 0);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_format_message_trims_driver_newline() {
    let text = format_message(&message(7, DebugMessageLevel::Info, DebugMessageCategory::Performance), 1);
    assert_eq!(text, "[7] [Performance/API] GL_INVALID_OPERATION in glDrawElements");
}

#[test]
#[should_panic(expected = "panic_on_error")]
fn test_sink_panics_on_error_when_configured() {
    let sink = DebugMessageSink::new(
        "lumen::test",
        DebugSinkConfig {
            severity: DebugSeverity::All,
            output: DebugOutput::File(
                std::env::temp_dir().join("lumen_debug_panic.log").to_string_lossy().into_owned(),
            ),
            message_filter: DebugMessageFilter::default(),
            ignored_ids: Vec::new(),
            break_on_error: false,
            panic_on_error: true,
            enable_stats: false,
        },
    );
    sink.report(&message(1, DebugMessageLevel::Error, DebugMessageCategory::Validation));
}

fn panicking_config() -> DebugSinkConfig {
    DebugSinkConfig {
        severity: DebugSeverity::All,
        output: DebugOutput::File(
            std::env::temp_dir().join("lumen_debug_deferred.log").to_string_lossy().into_owned(),
        ),
        message_filter: DebugMessageFilter::default(),
        ignored_ids: Vec::new(),
        break_on_error: false,
        panic_on_error: true,
        enable_stats: false,
    }
}

#[test]
fn test_deferred_error_does_not_unwind_in_callback() {
    let sink = DebugMessageSink::new("lumen::test", panicking_config());

    let reported = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        sink.report_deferred(&message(1, DebugMessageLevel::Error, DebugMessageCategory::Validation))
    }));
    assert!(matches!(reported, Ok(true)));
    assert!(sink.has_deferred());

    // Warnings never arm the failure
    let quiet = DebugMessageSink::new("lumen::test", panicking_config());
    quiet.report_deferred(&message(2, DebugMessageLevel::Warning, DebugMessageCategory::Validation));
    assert!(!quiet.has_deferred());
    quiet.raise_deferred();
}

#[test]
#[should_panic(expected = "debug message 3 reported as error")]
fn test_deferred_error_is_raised_later() {
    let sink = DebugMessageSink::new("lumen::test", panicking_config());
    sink.report_deferred(&message(3, DebugMessageLevel::Error, DebugMessageCategory::Validation));
    sink.report_deferred(&message(4, DebugMessageLevel::Error, DebugMessageCategory::Validation));
    sink.raise_deferred();
}
