use bitflags::bitflags;

mod bitscan;
mod encoder;
pub mod link;
pub mod scan;
pub mod tap;

/// 1149.7 scan format currently selected on the link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanFormat {
    /// 4-wire JTAG emulated over the 2-wire pins.
    Normal,
    /// OSCAN1 2-wire signaling.
    Oscan1,
}

bitflags! {
    /// TMS/TDI values for one scan cycle.
    pub struct CycleBits: u8 {
        const TDI = 1 << 0;
        const TMS = 1 << 1;
    }
}

/// Receive buffer sizing. A scan of `bits` is accepted when
/// `bits + MAX_PREAMBLE + MAX_POSTAMBLE <= MAX_SUPPORTED_SCAN_LENGTH`.
pub const MAX_SUPPORTED_SCAN_LENGTH: usize = 1000;
/// Longest state-change prefix before the shift state ("111100").
pub const MAX_PREAMBLE: usize = 6;
/// Longest state-change suffix after Exit1 ("10").
pub const MAX_POSTAMBLE: usize = 2;

/// Zero/non-zero-bit scans encode a value as a count of DR touches; the
/// router only decodes counts up to 10.
pub(crate) const MAX_BIT_SCAN_COUNT: usize = 10;

// 1149.7 star-command opcodes and operands.
/// Store Miscellaneous Control.
pub(crate) const STMC: usize = 0;
/// Store Format.
pub(crate) const STFMT: usize = 3;
/// STFMT operand selecting OSCAN1.
pub(crate) const OSCAN1_FORMAT: usize = 9;
/// STMC operand exiting the command level.
pub(crate) const EXIT_CMD_LVL: usize = 1;

/// The bit-bang engine packs the sampled TDO into this bit of each response
/// byte. Fixed contract of the adapter, not a tunable.
pub(crate) const TDO_SAMPLE_BIT: usize = 7;
