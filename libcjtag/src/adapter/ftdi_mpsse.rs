use anyhow::{bail, Context, Result};
use log::debug;
use safe_ftdi;

use crate::adapter::AdapterChannel;

/// FTDI channel in MPSSE mode. The protocol layer writes fully formed MPSSE
/// command bytes, so this only has to open the device, enter MPSSE mode and
/// keep the byte streams in sync.
pub struct FtdiChannel {
    device: safe_ftdi::Context,
}

impl FtdiChannel {
    pub fn new(vid: u16, pid: u16) -> Result<Self> {
        let mut device = safe_ftdi::Context::new()?;
        device
            .open(vid, pid)
            .with_context(|| format!("failed to open {:#06x}:{:#06x}", vid, pid))?;
        device.set_baudrate(1000)?;
        device.set_bitmode(0, safe_ftdi::mpsse::MpsseMode::BITMODE_MPSSE)?;

        let mut channel = FtdiChannel { device };
        channel.sync_rx_buffer()?;
        Ok(channel)
    }

    /// Drain stale response bytes by sending the 0xAA bad-command probe and
    /// reading until the FA AA echo comes back.
    fn sync_rx_buffer(&mut self) -> Result<()> {
        self.device.write_data(&[0xAA])?;

        let mut tmp = [0];
        self.device.read_data(&mut tmp)?;
        let mut before = tmp[0];
        loop {
            self.device.read_data(&mut tmp)?;
            let next = tmp[0];
            if before == 0xFA && next == 0xAA {
                break;
            }
            before = next;
        }
        debug!("mpsse rx buffer in sync");
        Ok(())
    }
}

impl AdapterChannel for FtdiChannel {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let written = self.device.write_data(data)? as usize;
        if written != data.len() {
            bail!("short write: {} of {} bytes", written, data.len());
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<()> {
        // read_data returns whatever the chip has buffered; block until the
        // requested count arrives.
        let mut filled = 0;
        while filled < buffer.len() {
            let count = self.device.read_data(&mut buffer[filled..])? as usize;
            filled += count;
        }
        Ok(())
    }
}
