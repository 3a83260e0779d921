//! Control plane
//!
//! A single dispatch entry point maps an opaque command code plus an
//! argument onto the link's operations. Codes carry a magic type byte in
//! the conventional ioctl layout; anything with the wrong magic or an
//! unknown number is rejected as `InvalidCommand` with no side effects.
//! Every command body runs while holding the instance mutex.

use crate::config::DebugLevel;
use crate::error::{Error, Result};
use crate::link::Link;
use crate::transfer::{exchange_bounded, TransferDescriptor};

/// Magic type byte carried by every command code
pub const COMMAND_MAGIC: u8 = 0xCA;

const TYPE_SHIFT: u32 = 8;
const SIZE_SHIFT: u32 = 16;
const DIR_SHIFT: u32 = 30;
const DIR_WRITE: u32 = 1;

/// Build a write-direction command code: dir | size | magic | nr
const fn iow(nr: u8, size: u16) -> u32 {
    (DIR_WRITE << DIR_SHIFT)
        | ((size as u32) << SIZE_SHIFT)
        | ((COMMAND_MAGIC as u32) << TYPE_SHIFT)
        | nr as u32
}

/// Size tag of a pointer-sized scalar argument
const ARG_SIZE: u16 = 8;
/// Size tag of the raw transfer descriptor {rx ptr, tx ptr, len}
const XFER_SIZE: u16 = 24;

/// Stable command codes of the control plane
pub mod codes {
    use super::{iow, ARG_SIZE, XFER_SIZE};

    pub const SET_POWER: u32 = iow(0x01, ARG_SIZE);
    pub const SET_DEBUG: u32 = iow(0x02, ARG_SIZE);
    pub const SET_POLL: u32 = iow(0x03, ARG_SIZE);
    pub const SET_SPI_CONFIG: u32 = iow(0x04, ARG_SIZE);
    pub const ENABLE_SPI_CLK: u32 = iow(0x05, ARG_SIZE);
    pub const DISABLE_SPI_CLK: u32 = iow(0x06, ARG_SIZE);
    pub const SET_SPI_CLK: u32 = iow(0x07, ARG_SIZE);
    pub const ENABLE_SPI_CS: u32 = iow(0x08, ARG_SIZE);
    pub const DISABLE_SPI_CS: u32 = iow(0x09, ARG_SIZE);
    pub const RW_SPI_DATA: u32 = iow(0x0A, XFER_SIZE);
    pub const ENABLE_CLK_CS: u32 = iow(0x0B, ARG_SIZE);
    pub const DISABLE_CLK_CS: u32 = iow(0x0C, ARG_SIZE);
    pub const SWING_CS: u32 = iow(0x0D, ARG_SIZE);
}

/// Decoded control-plane command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetPower,
    SetDebug,
    SetPoll,
    SetSpiConfig,
    EnableClock,
    DisableClock,
    SetClockRate,
    EnableSelect,
    DisableSelect,
    RawTransfer,
    EnableClockSelect,
    DisableClockSelect,
    SwingSelect,
}

impl Command {
    /// Decode a raw code, validating the magic byte first.
    pub fn decode(code: u32) -> Result<Command> {
        let magic = ((code >> TYPE_SHIFT) & 0xFF) as u8;
        if magic != COMMAND_MAGIC {
            log::error!(
                "invalid command magic: cmd={:#X} got={:#X} expected={:#X}",
                code,
                magic,
                COMMAND_MAGIC
            );
            return Err(Error::InvalidCommand);
        }
        match code {
            codes::SET_POWER => Ok(Command::SetPower),
            codes::SET_DEBUG => Ok(Command::SetDebug),
            codes::SET_POLL => Ok(Command::SetPoll),
            codes::SET_SPI_CONFIG => Ok(Command::SetSpiConfig),
            codes::ENABLE_SPI_CLK => Ok(Command::EnableClock),
            codes::DISABLE_SPI_CLK => Ok(Command::DisableClock),
            codes::SET_SPI_CLK => Ok(Command::SetClockRate),
            codes::ENABLE_SPI_CS => Ok(Command::EnableSelect),
            codes::DISABLE_SPI_CS => Ok(Command::DisableSelect),
            codes::RW_SPI_DATA => Ok(Command::RawTransfer),
            codes::ENABLE_CLK_CS => Ok(Command::EnableClockSelect),
            codes::DISABLE_CLK_CS => Ok(Command::DisableClockSelect),
            codes::SWING_CS => Ok(Command::SwingSelect),
            _ => {
                log::debug!("no matching command: {:#X}", code);
                Err(Error::InvalidCommand)
            }
        }
    }
}

/// Argument accompanying a control-plane command
#[derive(Debug, Default)]
pub enum CommandArg<'a> {
    #[default]
    None,
    /// Pointer-sized scalar
    Value(u64),
    /// Raw transfer descriptor for [`codes::RW_SPI_DATA`]
    Transfer(TransferDescriptor<'a>),
}

impl CommandArg<'_> {
    fn value(&self) -> Result<u64> {
        match self {
            CommandArg::Value(v) => Ok(*v),
            _ => Err(Error::InvalidArgument),
        }
    }
}

impl Link {
    /// Set poll-vs-interrupt read mode.
    pub fn set_poll_mode(&self, poll: bool) {
        let mut inner = self.lock_state();
        inner.poll_mode = poll;
        if inner.config.debug.enabled() {
            if poll {
                log::debug!("poll mode set");
            } else {
                log::debug!("interrupt mode set");
            }
        }
    }

    /// Current debug verbosity.
    pub fn debug_level(&self) -> DebugLevel {
        self.lock_state().config.debug
    }

    /// Dispatch one control-plane command.
    ///
    /// Returns the delivered length for a raw transfer and 0 for every
    /// other command. Unknown codes fail before any state is touched.
    pub fn command(&self, code: u32, arg: CommandArg<'_>) -> Result<u64> {
        let cmd = Command::decode(code)?;
        let mut inner = self.lock_state();

        match cmd {
            Command::SetPower => {
                // Reserved: 1 = soft reset, 2 = hard reset. Currently a
                // placeholder with no effect.
                let _ = arg.value()?;
                Ok(0)
            }
            Command::SetDebug => {
                inner.config.debug = DebugLevel::from_raw(arg.value()?);
                Ok(0)
            }
            Command::SetPoll => {
                let poll = arg.value()? != 0;
                inner.poll_mode = poll;
                if inner.config.debug.enabled() {
                    if poll {
                        log::debug!("poll mode set");
                    } else {
                        log::debug!("interrupt mode set");
                    }
                }
                Ok(0)
            }
            Command::SetSpiConfig => Ok(0),
            Command::EnableClock => {
                if inner.config.debug.enabled() {
                    log::debug!("command: enable clock");
                }
                self.enable_clock_locked(&mut inner).map(|_| 0)
            }
            Command::DisableClock => {
                if inner.config.debug.enabled() {
                    log::debug!("command: disable clock");
                }
                self.disable_clock_locked(&mut inner).map(|_| 0)
            }
            Command::SetClockRate => {
                let hz = u32::try_from(arg.value()?).map_err(|_| Error::InvalidArgument)?;
                self.set_clock_rate_locked(&mut inner, hz).map(|_| 0)
            }
            Command::EnableSelect => inner.assert_select().map(|_| 0),
            Command::DisableSelect => inner.deassert_select().map(|_| 0),
            Command::RawTransfer => {
                let mut desc = match arg {
                    CommandArg::Transfer(desc) => desc,
                    _ => return Err(Error::InvalidArgument),
                };
                let bus = self.resolve_bus()?;
                let delivered = exchange_bounded(&bus, &mut desc, inner.config.transfer_timeout)?;
                Ok(delivered as u64)
            }
            Command::EnableClockSelect => {
                if inner.config.debug.enabled() {
                    log::debug!("command: enable clock+select");
                }
                self.enable_clock_locked(&mut inner)?;
                inner.assert_select().map(|_| 0)
            }
            Command::DisableClockSelect => {
                if inner.config.debug.enabled() {
                    log::debug!("command: disable clock+select");
                }
                if !inner.clock_enabled {
                    return Ok(0);
                }
                inner.deassert_select()?;
                self.disable_clock_locked(&mut inner).map(|_| 0)
            }
            Command::SwingSelect => {
                let count = arg.value()? as usize;
                inner.swing_assert(count)?;
                if inner.config.debug.enabled() {
                    log::debug!("swing: {} pulses", count);
                }
                Ok(0)
            }
        }
    }
}
