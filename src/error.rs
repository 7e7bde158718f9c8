//! # Error Types
//!
//! Custom error types for Tilt Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Tilt Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network endpoint errors (bind, address resolution)
    #[error("Network error: {0}")]
    Network(String),

    /// Virtual controller errors
    #[error("Output device error: {0}")]
    Output(String),
}

/// Result type alias for Tilt Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
