//! Error types for Linux GPIO operations

use thiserror::Error;

/// Linux GPIO specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request GPIO lines
    #[error("Failed to request GPIO lines: {0}")]
    LineRequestFailed(#[source] gpiocdev::Error),

    /// Failed to set GPIO line value
    #[error("Failed to set GPIO line value: {0}")]
    SetValueFailed(#[source] gpiocdev::Error),

    /// Failed to read an edge event
    #[error("Failed to read GPIO edge event: {0}")]
    EdgeReadFailed(#[source] gpiocdev::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Missing required parameter
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// GPIO chip or device not specified
    #[error("No GPIO chip specified. Use dev=/dev/gpiochipN or gpiochip=N")]
    NoDevice,
}

/// Result type for Linux GPIO operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
