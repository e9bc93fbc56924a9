/// Debug-message configuration and validation statistics shared by all backends

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use rustc_hash::FxHashMap;

use crate::log::{format_plain, LogEntry, LogSeverity};

/// Which driver debug messages are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors (high severity)
    ErrorsOnly,
    /// Errors and warnings (high, medium, low)
    ErrorsAndWarnings,
    /// Everything, notifications included
    All,
}

/// Where driver debug messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    /// Through the engine logger only
    Console,
    /// Appended to a file only
    File(String),
    /// Engine logger and file
    Both(String),
}

impl DebugOutput {
    pub fn file_path(&self) -> Option<&str> {
        match self {
            DebugOutput::Console => None,
            DebugOutput::File(path) | DebugOutput::Both(path) => Some(path),
        }
    }

    pub fn to_console(&self) -> bool {
        !matches!(self, DebugOutput::File(_))
    }
}

/// Category filter for driver debug messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    /// Messages not covered by the other categories
    pub show_general: bool,
    /// API misuse: errors, deprecated or undefined behavior
    pub show_validation: bool,
    /// Performance hints
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Category of a debug message after backend classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugMessageCategory {
    General,
    Validation,
    Performance,
}

impl DebugMessageCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebugMessageCategory::General => "General",
            DebugMessageCategory::Validation => "Validation",
            DebugMessageCategory::Performance => "Performance",
        }
    }
}

impl fmt::Display for DebugMessageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DebugMessageFilter {
    pub fn allows(&self, category: DebugMessageCategory) -> bool {
        match category {
            DebugMessageCategory::General => self.show_general,
            DebugMessageCategory::Validation => self.show_validation,
            DebugMessageCategory::Performance => self.show_performance,
        }
    }
}

/// Severity of a debug message after backend classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugMessageLevel {
    Verbose,
    Info,
    Warning,
    Error,
}

impl DebugSeverity {
    /// Whether a message of the given level passes this threshold
    pub fn allows(&self, level: DebugMessageLevel) -> bool {
        match self {
            DebugSeverity::ErrorsOnly => level == DebugMessageLevel::Error,
            DebugSeverity::ErrorsAndWarnings => level >= DebugMessageLevel::Warning,
            DebugSeverity::All => true,
        }
    }
}

/// Snapshot of counted debug messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Message counters owned by one backend instance
///
/// Counters are atomic so a driver callback registered as `Send + Sync` can share
/// the tracker through an `Arc`.
#[derive(Debug, Default)]
pub struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, level: DebugMessageLevel) {
        let counter = match level {
            DebugMessageLevel::Error => &self.errors,
            DebugMessageLevel::Warning => &self.warnings,
            DebugMessageLevel::Info => &self.info,
            DebugMessageLevel::Verbose => &self.verbose,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

/// Settings consumed by a `DebugMessageSink`, taken from the renderer `Config`
#[derive(Debug, Clone)]
pub struct DebugSinkConfig {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
    pub ignored_ids: Vec<u32>,
    pub break_on_error: bool,
    pub panic_on_error: bool,
    pub enable_stats: bool,
}

/// One driver debug message after backend classification
#[derive(Debug, Clone, Copy)]
pub struct DebugMessage<'a> {
    pub id: u32,
    pub level: DebugMessageLevel,
    pub category: DebugMessageCategory,
    /// Driver-reported origin ("API", "Shader Compiler", ...)
    pub origin: &'a str,
    pub text: &'a str,
}

/// Filters, counts and routes driver debug messages
///
/// Backends wrap the sink in an `Arc` and hand it to the driver callback, so every
/// field is thread-safe even though rendering itself is single-threaded.
#[derive(Debug)]
pub struct DebugMessageSink {
    source: &'static str,
    config: DebugSinkConfig,
    stats: ValidationStatsTracker,
    repeats: Mutex<FxHashMap<u32, u32>>,
    /// Error held back by `report_deferred` until `raise_deferred`
    deferred: Mutex<Option<String>>,
}

impl DebugMessageSink {
    pub fn new(source: &'static str, config: DebugSinkConfig) -> Arc<Self> {
        Arc::new(Self {
            source,
            config,
            stats: ValidationStatsTracker::new(),
            repeats: Mutex::new(FxHashMap::default()),
            deferred: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &DebugSinkConfig {
        &self.config
    }

    pub fn stats(&self) -> ValidationStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
        if let Ok(mut repeats) = self.repeats.lock() {
            repeats.clear();
        }
    }

    /// True when the message survives the ignore list, severity and category filters
    pub fn accepts(&self, message: &DebugMessage<'_>) -> bool {
        !self.config.ignored_ids.contains(&message.id)
            && self.config.severity.allows(message.level)
            && self.config.message_filter.allows(message.category)
    }

    /// Report a message. Returns false when it was filtered out.
    pub fn report(&self, message: &DebugMessage<'_>) -> bool {
        self.route(message, false)
    }

    /// Report from inside a driver callback, where unwinding is not allowed
    ///
    /// A `panic_on_error` failure is stored instead of raised; the renderer
    /// raises it from its own stack with `raise_deferred`.
    pub fn report_deferred(&self, message: &DebugMessage<'_>) -> bool {
        self.route(message, true)
    }

    /// Panic with the first error held back by `report_deferred`, if any
    pub fn raise_deferred(&self) {
        let pending = self.deferred.lock().ok().and_then(|mut deferred| deferred.take());
        if let Some(failure) = pending {
            panic!("{}", failure);
        }
    }

    pub fn has_deferred(&self) -> bool {
        self.deferred.lock().map(|deferred| deferred.is_some()).unwrap_or(false)
    }

    fn route(&self, message: &DebugMessage<'_>, defer: bool) -> bool {
        if !self.accepts(message) {
            return false;
        }

        let occurrences = if self.config.enable_stats {
            self.stats.record(message.level);
            self.repeats
                .lock()
                .map(|mut repeats| {
                    let count = repeats.entry(message.id).or_insert(0);
                    *count += 1;
                    *count
                })
                .unwrap_or(1)
        } else {
            1
        };

        let entry = LogEntry {
            severity: log_severity(message.level),
            timestamp: SystemTime::now(),
            source: self.source.to_string(),
            message: format_message(message, occurrences),
            file: None,
            line: None,
        };

        if self.config.output.to_console() {
            crate::engine::Engine::log(entry.severity, &entry.source, entry.message.clone());
        }
        if let Some(path) = self.config.output.file_path() {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = writeln!(file, "{}", format_plain(&entry));
            }
        }

        if message.level == DebugMessageLevel::Error {
            if self.config.panic_on_error {
                let failure = format!(
                    "debug message {} reported as error (panic_on_error): {}",
                    message.id,
                    message.text.trim_end()
                );
                if !defer {
                    panic!("{}", failure);
                }
                if let Ok(mut deferred) = self.deferred.lock() {
                    deferred.get_or_insert(failure);
                }
                return true;
            }
            if self.config.break_on_error {
                crate::engine_error!(
                    self.source,
                    "Aborting on debug message {} (break_on_error)",
                    message.id
                );
                std::process::abort();
            }
        }

        true
    }
}

/// Engine log severity for a classified debug message
pub fn log_severity(level: DebugMessageLevel) -> LogSeverity {
    match level {
        DebugMessageLevel::Error => LogSeverity::Error,
        DebugMessageLevel::Warning => LogSeverity::Warn,
        DebugMessageLevel::Info => LogSeverity::Info,
        DebugMessageLevel::Verbose => LogSeverity::Debug,
    }
}

/// `[id] [Category/origin] text`, with a repeat marker from the second occurrence on
pub fn format_message(message: &DebugMessage<'_>, occurrences: u32) -> String {
    let mut text = format!(
        "[{}] [{}/{}] {}",
        message.id,
        message.category,
        message.origin,
        message.text.trim_end()
    );
    if occurrences > 1 {
        text.push_str(&format!(" [x{}]", occurrences));
    }
    text
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
