//! Error types for the Aurora3D engine
//!
//! This module defines the error types used throughout the engine,
//! including rendering, initialization, and resource management.

use std::fmt;

/// Result type for Aurora3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Aurora3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, validation, configuration mismatch)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, shader, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, renderer, subsystems)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Build a `BackendError` and log it through the engine logger.
///
/// # Example
///
/// ```no_run
/// use aurora_3d_engine::engine_err;
///
/// let index = 3;
/// let err = engine_err!("aurora3d::Buffer", "Field index {} out of bounds", index);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        $crate::engine_error!($source, $($arg)*);
        $crate::aurora3d::Error::BackendError(format!($($arg)*))
    }};
}

/// Log an error through the engine logger and return it from the
/// enclosing function.
///
/// # Example
///
/// ```no_run
/// use aurora_3d_engine::aurora3d::Result;
/// use aurora_3d_engine::engine_bail;
///
/// fn validate(fields: &[u32]) -> Result<()> {
///     if fields.is_empty() {
///         engine_bail!("aurora3d::Buffer", "Buffer must have at least one field");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
