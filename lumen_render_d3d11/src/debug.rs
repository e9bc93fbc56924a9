/// Direct3D 11 debug layer - drains the info queue into a `DebugMessageSink`
///
/// The debug layer has no callback: stored messages are pulled after each
/// draw and present, classified, then handed to the sink.

use std::sync::Arc;

use colored::*;
use lumen_render::engine_warn;
use lumen_render::lumen::render::{
    DebugMessage, DebugMessageCategory, DebugMessageLevel, DebugMessageSink, ValidationStats,
};
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D11::*;

pub fn message_level(severity: D3D11_MESSAGE_SEVERITY) -> DebugMessageLevel {
    match severity {
        D3D11_MESSAGE_SEVERITY_CORRUPTION | D3D11_MESSAGE_SEVERITY_ERROR => DebugMessageLevel::Error,
        D3D11_MESSAGE_SEVERITY_WARNING => DebugMessageLevel::Warning,
        D3D11_MESSAGE_SEVERITY_INFO => DebugMessageLevel::Info,
        _ => DebugMessageLevel::Verbose,
    }
}

pub fn message_category(category: D3D11_MESSAGE_CATEGORY) -> DebugMessageCategory {
    match category {
        D3D11_MESSAGE_CATEGORY_EXECUTION
        | D3D11_MESSAGE_CATEGORY_STATE_CREATION
        | D3D11_MESSAGE_CATEGORY_STATE_SETTING
        | D3D11_MESSAGE_CATEGORY_STATE_GETTING
        | D3D11_MESSAGE_CATEGORY_RESOURCE_MANIPULATION => DebugMessageCategory::Validation,
        _ => DebugMessageCategory::General,
    }
}

pub fn message_origin(category: D3D11_MESSAGE_CATEGORY) -> &'static str {
    match category {
        D3D11_MESSAGE_CATEGORY_APPLICATION_DEFINED => "Application",
        D3D11_MESSAGE_CATEGORY_INITIALIZATION => "Initialization",
        D3D11_MESSAGE_CATEGORY_CLEANUP => "Cleanup",
        D3D11_MESSAGE_CATEGORY_COMPILATION => "Compilation",
        D3D11_MESSAGE_CATEGORY_STATE_CREATION => "State Creation",
        D3D11_MESSAGE_CATEGORY_STATE_SETTING => "State Setting",
        D3D11_MESSAGE_CATEGORY_STATE_GETTING => "State Getting",
        D3D11_MESSAGE_CATEGORY_RESOURCE_MANIPULATION => "Resource Manipulation",
        D3D11_MESSAGE_CATEGORY_EXECUTION => "Execution",
        D3D11_MESSAGE_CATEGORY_SHADER => "Shader",
        _ => "Miscellaneous",
    }
}

/// Info queue of a device created with the debug layer
#[derive(Debug)]
pub struct InfoQueueDrain {
    queue: ID3D11InfoQueue,
    sink: Arc<DebugMessageSink>,
}

impl InfoQueueDrain {
    /// `None` when the device was created without the debug layer
    pub fn new(device: &ID3D11Device, sink: Arc<DebugMessageSink>) -> Option<Self> {
        let queue = device.cast::<ID3D11InfoQueue>().ok()?;
        Some(Self { queue, sink })
    }

    pub fn sink(&self) -> &Arc<DebugMessageSink> {
        &self.sink
    }

    /// Report and clear every stored message
    pub fn drain(&self) {
        unsafe {
            let count = self.queue.GetNumStoredMessages();
            for index in 0..count {
                let mut length = 0usize;
                if self.queue.GetMessage(index, None, &mut length).is_err() || length == 0 {
                    continue;
                }
                // u64 storage keeps the message struct aligned
                let mut storage = vec![0u64; length.div_ceil(8)];
                let message = storage.as_mut_ptr() as *mut D3D11_MESSAGE;
                if let Err(e) = self.queue.GetMessage(index, Some(message), &mut length) {
                    engine_warn!("lumen::d3d11", "Failed to read debug message {}: {}", index, e);
                    continue;
                }

                let message = &*message;
                let text = if message.pDescription.is_null() {
                    String::new()
                } else {
                    let bytes = std::slice::from_raw_parts(message.pDescription, message.DescriptionByteLength);
                    String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()
                };
                self.sink.report(&DebugMessage {
                    id: message.ID.0 as u32,
                    level: message_level(message.Severity),
                    category: message_category(message.Category),
                    origin: message_origin(message.Category),
                    text: &text,
                });
            }
            self.queue.ClearStoredMessages();
        }
    }
}

/// Print a validation statistics report
pub fn print_validation_stats_report(stats: &ValidationStats) {
    if stats.total() == 0 {
        println!("\n{}", "✓ No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Direct3D 11 Debug Layer Report ===".bright_blue().bold());
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
    println!("{}\n", "======================================".bright_blue().bold());
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
