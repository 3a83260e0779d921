//! Raw exchange through the control plane
//!
//! Runs the canonical userspace sequence: open, enable clock + select,
//! one raw transfer, disable select + clock, close.

use crate::commands::hex_string;
use eselink_core::{codes, CommandArg, Error, Link, TransferDescriptor};

pub fn run(link: &Link, data: &[u8], len: Option<usize>) -> Result<(), Error> {
    let len = len.unwrap_or(data.len());

    link.open()?;
    let res = framed_exchange(link, data, len);
    link.close();

    let response = res?;
    println!("response ({} bytes): {}", response.len(), hex_string(&response));
    Ok(())
}

fn framed_exchange(link: &Link, data: &[u8], len: usize) -> Result<Vec<u8>, Error> {
    link.command(codes::ENABLE_CLK_CS, CommandArg::None)?;

    let mut rx = vec![0u8; len];
    let res = link.command(
        codes::RW_SPI_DATA,
        CommandArg::Transfer(TransferDescriptor {
            tx: Some(data),
            rx: Some(&mut rx),
            len,
        }),
    );

    // Undo clock + select even when the transfer failed.
    if let Err(e) = link.command(codes::DISABLE_CLK_CS, CommandArg::None) {
        log::error!("failed to disable clock+select: {}", e);
    }

    let delivered = res? as usize;
    rx.truncate(delivered);
    Ok(rx)
}
