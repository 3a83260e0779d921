//! Clock rate reconfiguration

use eselink_core::{codes, CommandArg, Error, Link};

pub fn run_set_clock(link: &Link, hz: u32) -> Result<(), Error> {
    link.open()?;
    let res = link.command(codes::SET_SPI_CLK, CommandArg::Value(hz as u64));
    link.close();

    res?;
    println!("bus clock target set to {} Hz", hz);
    Ok(())
}
