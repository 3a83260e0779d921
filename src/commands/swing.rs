//! Select-line swing recovery

use eselink_core::{codes, CommandArg, Error, Link};

pub fn run_swing(link: &Link, count: usize) -> Result<(), Error> {
    link.open()?;
    let res = link.command(codes::SWING_CS, CommandArg::Value(count as u64));
    link.close();

    res?;
    println!("swung select {} times", count);
    Ok(())
}
