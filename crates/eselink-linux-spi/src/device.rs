//! Linux spidev bus implementation
//!
//! This module provides the `SpidevBus` struct that implements the
//! `SpiBus` trait using Linux's spidev interface. Each exchange is a
//! single full-duplex `SPI_IOC_MESSAGE` transfer: the same clocking shifts
//! the request out and the response in.

use crate::error::{LinuxSpiError, Result};

use eselink_core::error::{Error as CoreError, Result as CoreResult};
use eselink_core::hal::SpiBus;

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::time::Duration;

/// Default SPI clock target in Hz (the link's probe-time speed)
const DEFAULT_SPEED_HZ: u32 = 1_000_000;

/// SPI mode constants
pub mod mode {
    /// SPI mode 0: CPOL=0, CPHA=0
    pub const MODE_0: u8 = 0;
    /// SPI mode 1: CPOL=0, CPHA=1
    pub const MODE_1: u8 = 1;
    /// SPI mode 2: CPOL=1, CPHA=0
    pub const MODE_2: u8 = 2;
    /// SPI mode 3: CPOL=1, CPHA=1
    pub const MODE_3: u8 = 3;
}

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    // Generate ioctl functions
    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of spi_ioc_transfer struct (for 64-bit systems)
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        // _IOC(dir, type, nr, size) = ((dir)<<30)|((size)<<16)|((type)<<8)|(nr)
        // with dir = _IOC_WRITE = 1
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

/// Configuration for opening a Linux spidev device
#[derive(Debug, Clone)]
pub struct SpidevConfig {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: String,
    /// SPI clock target in Hz (default: 1 MHz)
    pub speed_hz: u32,
    /// SPI mode (0-3, default: 3 - the secure element samples on the
    /// trailing edge of an idle-high clock)
    pub mode: u8,
}

impl Default for SpidevConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            speed_hz: DEFAULT_SPEED_HZ,
            mode: mode::MODE_3,
        }
    }
}

impl SpidevConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the SPI clock target in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Set the SPI mode (0-3)
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }
}

/// Linux spidev bus backend
///
/// Implements the `SpiBus` trait for Linux systems through the
/// `/dev/spidevX.Y` device interface.
///
/// The spidev ioctl cannot be interrupted once issued, so the exchange
/// deadline passed down from the core is advisory here: the call blocks
/// until the kernel returns.
pub struct SpidevBus {
    /// File handle for spidev device
    file: File,
    /// Current clock target in Hz
    speed_hz: u32,
}

impl SpidevBus {
    /// Open a Linux spidev device with the given configuration
    pub fn open(config: &SpidevConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxSpiError::NoDevice);
        }

        log::debug!("linux_spi: Opening device {}", config.device);

        // Open the device
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        // Set SPI mode
        let mode = config.mode;
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(|e| LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            })?;
        }

        // Set bits per word (always 8)
        let bits: u8 = 8;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        // Set clock target
        let speed = config.speed_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        log::info!(
            "linux_spi: Opened {} (mode={}, speed={} kHz)",
            config.device,
            mode,
            speed / 1000
        );

        Ok(Self {
            file,
            speed_hz: speed,
        })
    }

    /// Open a device with default settings
    pub fn open_device(device: &str) -> Result<Self> {
        Self::open(&SpidevConfig::new(device))
    }

    /// Perform one full-duplex exchange of `tx.len()` bytes
    fn spi_exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        if tx.len() != rx.len() {
            return Err(LinuxSpiError::LengthMismatch {
                tx: tx.len(),
                rx: rx.len(),
            });
        }

        let fd = self.file.as_raw_fd();

        let transfer = SpiIocTransfer {
            tx_buf: tx.as_ptr() as u64,
            rx_buf: rx.as_mut_ptr() as u64,
            len: tx.len() as u32,
            speed_hz: self.speed_hz,
            delay_usecs: 0,
            bits_per_word: 8,
            cs_change: 0,
            tx_nbits: 0,
            rx_nbits: 0,
            word_delay_usecs: 0,
            _pad: 0,
        };

        let ioctl_num = ioctl::spi_ioc_message(1);
        let ret = unsafe { libc::ioctl(fd, ioctl_num, &transfer) };

        if ret < 0 {
            return Err(LinuxSpiError::ExchangeFailed(
                std::io::Error::last_os_error(),
            ));
        }

        Ok(())
    }

    /// Get current clock target
    pub fn speed_hz(&self) -> u32 {
        self.speed_hz
    }

    /// Record and program a new clock target
    pub fn set_speed(&mut self, speed_hz: u32) -> Result<()> {
        let fd = self.file.as_raw_fd();
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed_hz).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed: speed_hz,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }
        self.speed_hz = speed_hz;
        log::debug!("linux_spi: Set speed to {} Hz", speed_hz);
        Ok(())
    }
}

/// Extract an errno-style code for the core taxonomy
fn hardware_code(err: &std::io::Error) -> i32 {
    err.raw_os_error().unwrap_or(-1)
}

impl SpiBus for SpidevBus {
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], _timeout: Duration) -> CoreResult<()> {
        // The ioctl blocks uninterruptibly; the deadline is advisory.
        self.spi_exchange(tx, rx).map_err(|e| {
            log::error!("linux_spi: {}", e);
            match e {
                LinuxSpiError::ExchangeFailed(io) => CoreError::Hardware(hardware_code(&io)),
                LinuxSpiError::LengthMismatch { .. } => CoreError::InvalidArgument,
                _ => CoreError::DeviceUnavailable,
            }
        })
    }

    fn max_speed(&self) -> u32 {
        self.speed_hz
    }

    fn set_max_speed(&mut self, hz: u32) -> CoreResult<()> {
        self.set_speed(hz).map_err(|e| {
            log::error!("linux_spi: {}", e);
            match e {
                LinuxSpiError::SetSpeedFailed { source, .. } => {
                    CoreError::Hardware(hardware_code(&source))
                }
                _ => CoreError::DeviceUnavailable,
            }
        })
    }
}

/// Parse backend options from a list of key-value pairs
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<SpidevConfig, String> {
    let mut config = SpidevConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "spispeed" => {
                // Parse speed in kHz
                let speed_khz: u32 = value
                    .parse()
                    .map_err(|_| format!("Invalid spispeed value: {}", value))?;
                config.speed_hz = speed_khz * 1000;
            }
            "mode" => {
                let mode: u8 = value
                    .parse()
                    .map_err(|_| format!("Invalid mode value: {}", value))?;
                if mode > 3 {
                    return Err(format!("Invalid SPI mode: {} (must be 0-3)", mode));
                }
                config.mode = mode;
            }
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        return Err("No device specified. Use dev=/dev/spidevX.Y".to_string());
    }

    Ok(config)
}
