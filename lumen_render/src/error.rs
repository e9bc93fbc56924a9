//! Error types for the Lumen renderer
//!
//! This module defines the error types shared by every backend: driver failures,
//! shader diagnostics, unsupported formats and caller-supplied parameter mismatches.

use std::fmt;

use crate::renderer::ShaderStage;

/// Result type for Lumen renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lumen renderer errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (OpenGL, Direct3D 11, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (foreign backend, not bound, already released)
    InvalidResource(String),

    /// Initialization failed (context, device, swap chain)
    InitializationFailed(String),

    /// A shader stage failed to compile. `log` is the driver's info log.
    ShaderCompilation {
        stage: ShaderStage,
        log: String,
    },

    /// A shader program failed to link. `log` is the driver's info log.
    ShaderLink {
        log: String,
    },

    /// Pixel, index or attribute format the backend cannot express
    UnsupportedFormat(String),

    /// Caller-supplied size, count or length that does not match the request
    InvalidParameter(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ShaderCompilation { stage, log } => {
                write!(f, "{} shader compilation failed: {}", stage, log.trim_end())
            }
            Error::ShaderLink { log } => write!(f, "Shader link failed: {}", log.trim_end()),
            Error::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            Error::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
