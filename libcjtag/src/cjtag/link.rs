use core::mem;

use anyhow::Result;
use log::{debug, info};
use rust_fsm::StateMachine;

use crate::adapter::AdapterChannel;
use crate::cjtag::tap::{TapState, TapTracker};
use crate::cjtag::{
    ScanFormat, EXIT_CMD_LVL, MAX_SUPPORTED_SCAN_LENGTH, OSCAN1_FORMAT, STFMT, STMC,
};

/// Per-session cJTAG link state. One instance per physical link; all
/// operations take `&mut self` and block until the channel transaction
/// completes.
pub struct CjtagLink<C> {
    pub channel: C,
    pub(crate) tap: StateMachine<TapTracker>,
    pub(crate) scan_format: ScanFormat,
    pub(crate) want_result: bool,
    pub(crate) tx_bit_count: usize,
    pub(crate) rx_buffer: Vec<u8>,
}

impl<C: AdapterChannel> CjtagLink<C> {
    /// Build a link context. No bus traffic until `initialize`.
    pub fn new(channel: C) -> Self {
        CjtagLink {
            channel,
            tap: StateMachine::new(),
            scan_format: ScanFormat::Normal,
            want_result: true,
            tx_bit_count: 0,
            rx_buffer: vec![0; MAX_SUPPORTED_SCAN_LENGTH],
        }
    }

    pub fn tap_state(&self) -> TapState {
        *self.tap.state()
    }

    pub fn scan_format(&self) -> ScanFormat {
        self.scan_format
    }

    pub fn want_result(&self) -> bool {
        self.want_result
    }

    pub(crate) fn in_normal_scan_mode(&self) -> bool {
        self.scan_format == ScanFormat::Normal
    }

    /// Set whether scans capture response data, returning the previous value
    /// so callers can wrap sub-sequences with save/restore.
    pub fn set_want_result(&mut self, want_result: bool) -> bool {
        mem::replace(&mut self.want_result, want_result)
    }

    /// One-time link bring-up: pin init, 1149.7 escape sequence, forced
    /// idle, then 2-wire mode entry and OSCAN1 switch.
    pub fn initialize(&mut self) -> Result<()> {
        self.scan_format = ScanFormat::Normal;
        self.want_result = true;
        self.tx_bit_count = 0;

        self.pin_init()?;
        self.escape_sequence()?;
        self.set_to_idle()?;
        self.enter_2wire_mode_and_test()?;
        info!("cjtag link up, format {:?}", self.scan_format);
        Ok(())
    }

    /// Force Run-Test/Idle from an unknown state. The forced-idle string can
    /// desynchronize 2-wire framing; if the format is no longer Normal
    /// afterwards, drop back to Normal, repeat the idle string once and
    /// rebuild 2-wire mode.
    pub(crate) fn set_to_idle(&mut self) -> Result<()> {
        self.transitions("0111110")?;

        if !self.in_normal_scan_mode() {
            debug!("forced idle left 2-wire framing stale, rebuilding");
            self.set_format(ScanFormat::Normal)?;
            self.transitions("0111110")?;
            self.enter_2wire_mode()?;
        }
        Ok(())
    }

    /// Full bring-up: lock control level 2 (disconnects the wide-JTAG taps),
    /// switch to OSCAN1, then touch shift-IR and return to idle to reconnect
    /// the taps.
    pub(crate) fn enter_2wire_mode_and_test(&mut self) -> Result<()> {
        let wanted = self.set_want_result(false);
        let result = (|| {
            self.set_to_idle()?;
            self.enter_control_mode(2)?;
            self.enter_oscan1()?;
            self.transitions("1100110")
        })();
        self.set_want_result(wanted);
        result
    }

    /// Re-entrant variant used during idle recovery: after the OSCAN1 switch
    /// it exits the command level so the taps come back without the
    /// reconnect string.
    pub(crate) fn enter_2wire_mode(&mut self) -> Result<()> {
        let wanted = self.set_want_result(false);
        let result = (|| {
            self.set_to_idle()?;
            self.enter_control_mode(2)?;
            self.enter_oscan1()?;
            self.send_two_part_command(STMC, EXIT_CMD_LVL)
        })();
        self.set_want_result(wanted);
        result
    }

    /// Switch the router to OSCAN1. The local format flag is only flipped
    /// after the on-wire command went out.
    pub(crate) fn enter_oscan1(&mut self) -> Result<()> {
        self.send_two_part_command(STFMT, OSCAN1_FORMAT)?;
        self.check_packet()?;
        self.set_format(ScanFormat::Oscan1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockChannel;

    #[test]
    fn initialize_reaches_oscan1_at_idle() {
        let mut link = CjtagLink::new(MockChannel::new());
        link.initialize().unwrap();
        assert_eq!(ScanFormat::Oscan1, link.scan_format());
        assert_eq!(TapState::RunIdle, link.tap_state());
        assert!(link.want_result());
    }

    #[test]
    fn want_result_restored_around_bring_up() {
        let mut link = CjtagLink::new(MockChannel::new());
        link.initialize().unwrap();

        for prior in [true, false] {
            link.set_want_result(prior);
            link.scan_format = ScanFormat::Normal;
            link.enter_2wire_mode_and_test().unwrap();
            assert_eq!(prior, link.want_result());

            link.set_want_result(prior);
            link.scan_format = ScanFormat::Normal;
            link.enter_2wire_mode().unwrap();
            assert_eq!(prior, link.want_result());
        }
    }

    #[test]
    fn want_result_accessor_returns_previous_value() {
        let mut link = CjtagLink::new(MockChannel::new());
        assert!(link.set_want_result(false));
        assert!(!link.set_want_result(true));
        assert!(link.want_result());
    }
}
