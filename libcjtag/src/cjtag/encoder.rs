use anyhow::Result;

use crate::adapter::AdapterChannel;
use crate::cjtag::link::CjtagLink;
use crate::cjtag::{CycleBits, ScanFormat};

/// Adapter command bytes for one OSCAN1 scan cycle: drive nTDI on TMSC,
/// pulse TCKC, drive TMS, pulse, then sample the TDO slot into one response
/// byte.
pub(crate) const OSCAN1_CYCLE_LEN: usize = 18;

/// The shift byte encodes (tms, tdi) as 01/00/03/02 for
/// (0,0)/(0,1)/(1,0)/(1,1); the GPIO bytes depend on TMS only.
pub(crate) fn oscan1_cycle_bytes(tms: bool, tdi: bool) -> [u8; OSCAN1_CYCLE_LEN] {
    let shift = (u8::from(tms) << 1) | u8::from(!tdi);
    let (gpio_a, gpio_b, gpio_c) = if tms {
        (0xB3, 0x82, 0xA2)
    } else {
        (0xB1, 0x80, 0xA0)
    };
    [
        0x1B, 0x00, shift, //
        0x97, 0x97, 0x97, //
        0x80, gpio_a, 0xEB, //
        0x97, //
        0x80, gpio_b, 0xEB, //
        0x2A, 0x00, //
        0x80, gpio_c, 0xEB,
    ]
}

// GPIO direction/value toggles switching the 2-wire pins between the
// emulated 4-wire framing and OSCAN1 framing.
const FORMAT_NORMAL_SEQUENCE: [u8; 18] = [
    0x80, 0xA0, 0xEB, 0x82, 0x60, 0x60, //
    0x80, 0xA0, 0xEB, 0x82, 0x00, 0x60, //
    0x80, 0xE0, 0xEB, 0x82, 0x00, 0x60,
];

const FORMAT_OSCAN1_SEQUENCE: [u8; 18] = [
    0x80, 0xE0, 0xEB, 0x82, 0x00, 0x60, //
    0x80, 0xA0, 0xEB, 0x82, 0x60, 0x60, //
    0x80, 0xA0, 0xEB, 0x82, 0x60, 0x60,
];

// Starting electrical state for the 2-wire pins, followed by a status read.
const PIN_INIT_SEQUENCE: [u8; 8] = [0x80, 0xE8, 0xEB, 0x82, 0x00, 0x60, 0x81, 0x87];

// 1149.7 escape sequence: edge bursts on TMSC while TCKC is held, bracketed
// by the pin idle state. Tells the on-chip router a cJTAG-aware debugger is
// attached.
const ESCAPE_SEQUENCE: [u8; 28] = [
    0x80, 0xE8, 0xFB, //
    0x80, 0xE8, 0xFA, //
    0x80, 0xF9, 0xFA, //
    0x8E, 0x00, //
    0x4B, 0x05, 0x6A, //
    0x4B, 0x01, 0x06, //
    0x8E, 0x00, //
    0x80, 0xE8, 0xFA, //
    0x80, 0xE8, 0xFB, //
    0x80, 0xE8, 0xEB,
];

impl<C: AdapterChannel> CjtagLink<C> {
    /// Put the adapter GPIOs in their starting state. The adapter answers
    /// with one status byte which is read and ignored.
    pub(crate) fn pin_init(&mut self) -> Result<()> {
        let mut status = [0u8; 1];
        self.channel.write_then_read(&PIN_INIT_SEQUENCE, &mut status)
    }

    pub(crate) fn escape_sequence(&mut self) -> Result<()> {
        self.channel.write(&ESCAPE_SEQUENCE)
    }

    /// Emit one scan cycle with the given TMS/TDI values, folding TMS into
    /// the tracked TAP state. The response byte is left in the adapter for
    /// the scan's terminal read.
    pub(crate) fn send_jtag(&mut self, bits: CycleBits) -> Result<()> {
        let cycle = oscan1_cycle_bytes(bits.contains(CycleBits::TMS), bits.contains(CycleBits::TDI));
        self.channel.write(&cycle)?;
        self.tap.consume(&bits.contains(CycleBits::TMS)).unwrap();
        Ok(())
    }

    /// Switch the adapter-side framing. No-op when already in `format`.
    pub(crate) fn set_format(&mut self, format: ScanFormat) -> Result<()> {
        if format == self.scan_format {
            return Ok(());
        }

        let sequence = match format {
            ScanFormat::Normal => &FORMAT_NORMAL_SEQUENCE,
            ScanFormat::Oscan1 => &FORMAT_OSCAN1_SEQUENCE,
        };
        self.channel.write(sequence)?;
        self.scan_format = format;
        Ok(())
    }

    pub(crate) fn send_check_packet(&mut self) -> Result<()> {
        let opcode = if self.in_normal_scan_mode() { 0x4B } else { 0x1B };
        self.channel.write(&[opcode, 0x03, 0x00])
    }

    /// A single 0-valued transition, RTI to RTI.
    pub(crate) fn dummy_scan_packet(&mut self) -> Result<()> {
        self.transitions("0")
    }

    /// Check packet, preceded in OSCAN1 by a dummy scan packet so the
    /// router's packet-boundary detector sees the idle-to-idle transition
    /// (IEEE 1149.7 section 21.7).
    pub(crate) fn check_packet(&mut self) -> Result<()> {
        if !self.in_normal_scan_mode() {
            self.dummy_scan_packet()?;
        }
        self.send_check_packet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockChannel;

    fn oscan1_link() -> CjtagLink<MockChannel> {
        let mut link = CjtagLink::new(MockChannel::new());
        link.scan_format = ScanFormat::Oscan1;
        link
    }

    #[test]
    fn format_switch_is_idempotent() {
        let mut link = CjtagLink::new(MockChannel::new());
        link.set_format(ScanFormat::Normal).unwrap();
        assert!(link.channel.written.is_empty());
        assert_eq!(ScanFormat::Normal, link.scan_format());

        let mut link = oscan1_link();
        link.set_format(ScanFormat::Oscan1).unwrap();
        assert!(link.channel.written.is_empty());
        assert_eq!(ScanFormat::Oscan1, link.scan_format());
    }

    #[test]
    fn format_switch_emits_one_toggle_sequence() {
        let mut link = CjtagLink::new(MockChannel::new());
        link.set_format(ScanFormat::Oscan1).unwrap();
        assert_eq!(FORMAT_OSCAN1_SEQUENCE.to_vec(), link.channel.written);
        assert_eq!(ScanFormat::Oscan1, link.scan_format());

        link.channel.written.clear();
        link.set_format(ScanFormat::Normal).unwrap();
        assert_eq!(FORMAT_NORMAL_SEQUENCE.to_vec(), link.channel.written);
    }

    #[test]
    fn check_packet_opcode_tracks_format() {
        let mut link = CjtagLink::new(MockChannel::new());
        link.check_packet().unwrap();
        // Normal: no dummy scan packet, 0x4B-class opcode.
        assert_eq!(vec![0x4B, 0x03, 0x00], link.channel.written);

        let mut link = oscan1_link();
        link.check_packet().unwrap();
        // OSCAN1: one dummy cycle plus tail, then the 0x1B-class packet.
        let mut expected = oscan1_cycle_bytes(false, false).to_vec();
        expected.push(0x87);
        expected.extend_from_slice(&[0x1B, 0x03, 0x00]);
        assert_eq!(expected, link.channel.written);
    }

    #[test]
    fn cycle_bytes_encode_the_four_tms_tdi_combinations() {
        assert_eq!(0x01, oscan1_cycle_bytes(false, false)[2]);
        assert_eq!(0x00, oscan1_cycle_bytes(false, true)[2]);
        assert_eq!(0x03, oscan1_cycle_bytes(true, false)[2]);
        assert_eq!(0x02, oscan1_cycle_bytes(true, true)[2]);
        // GPIO bytes depend on TMS only.
        for tdi in [false, true] {
            let low = oscan1_cycle_bytes(false, tdi);
            assert_eq!((0xB1, 0x80, 0xA0), (low[7], low[11], low[16]));
            let high = oscan1_cycle_bytes(true, tdi);
            assert_eq!((0xB3, 0x82, 0xA2), (high[7], high[11], high[16]));
        }
    }

    #[test]
    fn pin_init_discards_one_status_byte() {
        let mut link = CjtagLink::new(MockChannel::new());
        link.pin_init().unwrap();
        assert_eq!(PIN_INIT_SEQUENCE.to_vec(), link.channel.written);
        assert_eq!(1, link.channel.last_read_len);
    }
}
