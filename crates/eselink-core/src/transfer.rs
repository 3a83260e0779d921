//! Bounded transfer engine
//!
//! One call is one full-duplex exchange of at most [`MAX_BUFFER_SIZE`]
//! bytes. Request bytes are staged into a zero-filled scratch buffer,
//! handed to the bus primitive in a single shot and the response copied
//! back out. Length violations are rejected before any bus access.

use crate::error::{Error, Result};
use crate::link::BusHandle;
use std::time::Duration;

/// Size of the largest read/write buffer supported by the link
pub const MAX_BUFFER_SIZE: usize = 259;

/// One raw exchange, as submitted through the control plane.
///
/// `len` is the number of bytes clocked on the bus. `tx`/`rx` may each be
/// absent: a missing `tx` clocks zeros out, a missing `rx` discards the
/// response.
#[derive(Debug, Default)]
pub struct TransferDescriptor<'a> {
    pub tx: Option<&'a [u8]>,
    pub rx: Option<&'a mut [u8]>,
    pub len: usize,
}

/// Run one bounded exchange and report the length delivered to the caller.
///
/// On bus success the response is copied back with partial-delivery
/// tolerance: a receive buffer shorter than `len` shortens the reported
/// length instead of failing the call - the exchange already happened on
/// the wire. Bus failures propagate unchanged.
pub(crate) fn exchange_bounded(
    bus: &BusHandle,
    desc: &mut TransferDescriptor<'_>,
    timeout: Duration,
) -> Result<usize> {
    if desc.len == 0 || desc.len > MAX_BUFFER_SIZE {
        return Err(Error::MessageTooLarge);
    }

    let mut tx_buf = [0u8; MAX_BUFFER_SIZE];
    let mut rx_buf = [0u8; MAX_BUFFER_SIZE];

    if let Some(tx) = desc.tx {
        let staged = tx.len().min(desc.len);
        tx_buf[..staged].copy_from_slice(&tx[..staged]);
    }

    bus.exchange(&tx_buf[..desc.len], &mut rx_buf[..desc.len], timeout)?;

    let delivered = match desc.rx.as_deref_mut() {
        Some(rx) => {
            let n = desc.len.min(rx.len());
            rx[..n].copy_from_slice(&rx_buf[..n]);
            n
        }
        None => desc.len,
    };

    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::SpiBus;
    use std::sync::{Arc, Mutex};

    /// Bus that records exchanges and answers with a fixed byte pattern.
    struct PatternBus {
        fill: u8,
        log: Arc<Mutex<Vec<Vec<u8>>>>,
        fail: Option<Error>,
    }

    impl SpiBus for PatternBus {
        fn exchange(&mut self, tx: &[u8], rx: &mut [u8], _timeout: Duration) -> Result<()> {
            if let Some(e) = self.fail {
                return Err(e);
            }
            self.log.lock().unwrap().push(tx.to_vec());
            rx.fill(self.fill);
            Ok(())
        }

        fn max_speed(&self) -> u32 {
            1_000_000
        }

        fn set_max_speed(&mut self, _hz: u32) -> Result<()> {
            Ok(())
        }
    }

    fn pattern_bus(fill: u8) -> (Arc<BusHandle>, Arc<Mutex<Vec<Vec<u8>>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = BusHandle::new(Box::new(PatternBus {
            fill,
            log: Arc::clone(&log),
            fail: None,
        }));
        (bus, log)
    }

    #[test]
    fn rejects_zero_length() {
        let (bus, log) = pattern_bus(0xEE);
        let mut desc = TransferDescriptor {
            tx: Some(&[1, 2, 3]),
            rx: None,
            len: 0,
        };
        assert_eq!(
            exchange_bounded(&bus, &mut desc, Duration::from_secs(1)),
            Err(Error::MessageTooLarge)
        );
        // No bus access happened.
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn rejects_oversized_length() {
        let (bus, log) = pattern_bus(0xEE);
        let tx = [0u8; MAX_BUFFER_SIZE + 1];
        let mut desc = TransferDescriptor {
            tx: Some(&tx),
            rx: None,
            len: MAX_BUFFER_SIZE + 1,
        };
        assert_eq!(
            exchange_bounded(&bus, &mut desc, Duration::from_secs(1)),
            Err(Error::MessageTooLarge)
        );
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn accepts_max_length() {
        let (bus, _log) = pattern_bus(0x5A);
        let tx = [0xA5u8; MAX_BUFFER_SIZE];
        let mut rx = [0u8; MAX_BUFFER_SIZE];
        let mut desc = TransferDescriptor {
            tx: Some(&tx),
            rx: Some(&mut rx),
            len: MAX_BUFFER_SIZE,
        };
        let n = exchange_bounded(&bus, &mut desc, Duration::from_secs(1)).unwrap();
        assert_eq!(n, MAX_BUFFER_SIZE);
        assert!(rx.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn zero_fills_unused_tail() {
        let (bus, log) = pattern_bus(0x00);
        let mut desc = TransferDescriptor {
            tx: Some(&[0x11, 0x22]),
            rx: None,
            len: 5,
        };
        let n = exchange_bounded(&bus, &mut desc, Duration::from_secs(1)).unwrap();
        assert_eq!(n, 5);
        let seen = log.lock().unwrap();
        assert_eq!(seen[0], vec![0x11, 0x22, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn short_rx_buffer_shortens_delivery() {
        let (bus, _log) = pattern_bus(0x77);
        let mut rx = [0u8; 4];
        let mut desc = TransferDescriptor {
            tx: None,
            rx: Some(&mut rx),
            len: 16,
        };
        let n = exchange_bounded(&bus, &mut desc, Duration::from_secs(1)).unwrap();
        assert_eq!(n, 4);
        assert_eq!(rx, [0x77; 4]);
    }

    #[test]
    fn bus_failure_propagates() {
        let bus = BusHandle::new(Box::new(PatternBus {
            fill: 0,
            log: Arc::new(Mutex::new(Vec::new())),
            fail: Some(Error::Hardware(-5)),
        }));
        let mut desc = TransferDescriptor {
            tx: Some(&[1]),
            rx: None,
            len: 1,
        };
        assert_eq!(
            exchange_bounded(&bus, &mut desc, Duration::from_secs(1)),
            Err(Error::Hardware(-5))
        );
    }
}
