/// OpenGL debug output - routes `KHR_debug` messages through a `DebugMessageSink`
///
/// The callback classifies each driver message (severity, type, source),
/// then hands it to the sink which filters, counts and logs it.

use std::sync::Arc;

use colored::*;
use glow::HasContext;
use lumen_render::lumen::render::{
    DebugMessage, DebugMessageCategory, DebugMessageLevel, DebugMessageSink, DebugSeverity,
    ValidationStats,
};

/// Map a GL debug severity to the engine level
pub fn message_level(severity: u32) -> DebugMessageLevel {
    match severity {
        glow::DEBUG_SEVERITY_HIGH => DebugMessageLevel::Error,
        glow::DEBUG_SEVERITY_MEDIUM | glow::DEBUG_SEVERITY_LOW => DebugMessageLevel::Warning,
        glow::DEBUG_SEVERITY_NOTIFICATION => DebugMessageLevel::Info,
        _ => DebugMessageLevel::Verbose,
    }
}

/// Map a GL debug message type to the engine category
pub fn message_category(message_type: u32) -> DebugMessageCategory {
    match message_type {
        glow::DEBUG_TYPE_ERROR
        | glow::DEBUG_TYPE_DEPRECATED_BEHAVIOR
        | glow::DEBUG_TYPE_UNDEFINED_BEHAVIOR
        | glow::DEBUG_TYPE_PORTABILITY => DebugMessageCategory::Validation,
        glow::DEBUG_TYPE_PERFORMANCE => DebugMessageCategory::Performance,
        _ => DebugMessageCategory::General,
    }
}

/// Human-readable origin of a GL debug message
pub fn message_origin(source: u32) -> &'static str {
    match source {
        glow::DEBUG_SOURCE_API => "API",
        glow::DEBUG_SOURCE_WINDOW_SYSTEM => "Window System",
        glow::DEBUG_SOURCE_SHADER_COMPILER => "Shader Compiler",
        glow::DEBUG_SOURCE_THIRD_PARTY => "Third Party",
        glow::DEBUG_SOURCE_APPLICATION => "Application",
        _ => "Other",
    }
}

/// Classify and report one raw driver message
///
/// Runs inside the driver callback, so a `panic_on_error` failure is deferred
/// until the renderer calls `raise_deferred`.
pub fn report_gl_message(sink: &DebugMessageSink, source: u32, message_type: u32, id: u32, severity: u32, text: &str) -> bool {
    sink.report_deferred(&DebugMessage {
        id,
        level: message_level(severity),
        category: message_category(message_type),
        origin: message_origin(source),
        text,
    })
}

/// Enable synchronous debug output and register the callback
///
/// Severities below the configured threshold are disabled in the driver as well,
/// so they never cross into the callback.
pub fn install_debug_callback(gl: &mut glow::Context, sink: Arc<DebugMessageSink>) {
    let severity = sink.config().severity;
    unsafe {
        gl.enable(glow::DEBUG_OUTPUT);
        gl.enable(glow::DEBUG_OUTPUT_SYNCHRONOUS);

        gl.debug_message_control(glow::DONT_CARE, glow::DONT_CARE, glow::DONT_CARE, &[], true);
        if severity != DebugSeverity::All {
            gl.debug_message_control(glow::DONT_CARE, glow::DONT_CARE, glow::DEBUG_SEVERITY_NOTIFICATION, &[], false);
        }
        if severity == DebugSeverity::ErrorsOnly {
            for level in [glow::DEBUG_SEVERITY_LOW, glow::DEBUG_SEVERITY_MEDIUM] {
                gl.debug_message_control(glow::DONT_CARE, glow::DONT_CARE, level, &[], false);
            }
        }

        gl.debug_message_callback(move |source, message_type, id, severity, text| {
            report_gl_message(&sink, source, message_type, id, severity, text);
        });
    }
}

/// Print a validation statistics report
pub fn print_validation_stats_report(stats: &ValidationStats) {
    if stats.total() == 0 {
        println!("\n{}", "✓ No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== OpenGL Debug Output Report ===".bright_blue().bold());
    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());
    println!("{}\n", "==================================".bright_blue().bold());
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
