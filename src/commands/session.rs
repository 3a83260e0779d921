//! Direct select-framed read/write sessions

use crate::commands::hex_string;
use eselink_core::{Error, Link};

pub fn run_write(link: &Link, data: &[u8]) -> Result<(), Error> {
    link.open()?;
    let res = (|| {
        link.enable_clock()?;
        let sent = link.write(data)?;
        link.disable_clock()?;
        Ok(sent)
    })();
    link.close();

    let sent = res?;
    println!("wrote {} bytes", sent);
    Ok(())
}

pub fn run_read(link: &Link, count: usize) -> Result<(), Error> {
    link.open()?;
    let res = (|| {
        link.enable_clock()?;
        let mut buf = vec![0u8; count];
        let got = link.read(&mut buf)?;
        buf.truncate(got);
        link.disable_clock()?;
        Ok(buf)
    })();
    link.close();

    let buf = res?;
    println!("read {} bytes: {}", buf.len(), hex_string(&buf));
    Ok(())
}
