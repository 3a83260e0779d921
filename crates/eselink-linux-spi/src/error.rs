//! Error types for Linux spidev operations

use thiserror::Error;

/// Linux spidev specific errors
#[derive(Debug, Error)]
pub enum LinuxSpiError {
    /// Failed to open device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set SPI mode
    #[error("Failed to set SPI mode to {mode}: {source}")]
    SetModeFailed {
        mode: u8,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set bits per word
    #[error("Failed to set bits per word to {bits}: {source}")]
    SetBitsPerWordFailed {
        bits: u8,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set clock speed
    #[error("Failed to set clock speed to {speed} Hz: {source}")]
    SetSpeedFailed {
        speed: u32,
        #[source]
        source: std::io::Error,
    },

    /// Full-duplex exchange failed
    #[error("SPI exchange failed: {0}")]
    ExchangeFailed(#[source] std::io::Error),

    /// Mismatched exchange buffer lengths
    #[error("Exchange buffers differ in length: tx={tx} rx={rx}")]
    LengthMismatch { tx: usize, rx: usize },

    /// Device not specified
    #[error("No device specified. Use dev=/dev/spidevX.Y")]
    NoDevice,
}

/// Result type for Linux spidev operations
pub type Result<T> = std::result::Result<T, LinuxSpiError>;
