//! Error types for the EFB framebuffer subsystem
//!
//! Every GPU operation in this crate is expected to succeed. The variants below
//! describe why a rendering session became unusable; callers are not expected
//! to retry.

use std::fmt;

/// Result type for framebuffer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Framebuffer subsystem errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, mock device, poisoned device lock, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (wrong backend type, unmapped guest address, etc.)
    InvalidResource(String),

    /// Initialization failed (surface or staging buffer allocation)
    InitializationFailed(String),

    /// A readback staging buffer could not be mapped for CPU access
    MapFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::MapFailed(msg) => write!(f, "Map failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
