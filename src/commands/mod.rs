//! Command implementations

pub mod clock;
pub mod exchange;
pub mod session;
pub mod swing;

/// Format bytes as a lowercase hex string
pub fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
