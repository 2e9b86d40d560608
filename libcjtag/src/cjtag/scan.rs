use anyhow::Result;
use log::error;
use rust_fsm::StateMachine;

use crate::adapter::AdapterChannel;
use crate::cjtag::encoder::{oscan1_cycle_bytes, OSCAN1_CYCLE_LEN};
use crate::cjtag::link::CjtagLink;
use crate::cjtag::tap::TapState;
use crate::cjtag::{
    CycleBits, MAX_POSTAMBLE, MAX_PREAMBLE, MAX_SUPPORTED_SCAN_LENGTH, TDO_SAMPLE_BIT,
};

/// One IR or DR scan. Bit buffers are LSB-first; a missing `out_value`
/// shifts zeros, a missing `in_value` discards the captured bits.
pub struct ScanRequest<'a> {
    pub ir_scan: bool,
    pub num_bits: usize,
    pub out_value: Option<&'a [u8]>,
    pub in_value: Option<&'a mut [u8]>,
    pub end_state: TapState,
}

fn bit(buffer: &[u8], index: usize) -> bool {
    buffer[index / 8] & (1 << (index % 8)) != 0
}

fn set_bit(buffer: &mut [u8], index: usize, value: bool) {
    if value {
        buffer[index / 8] |= 1 << (index % 8);
    } else {
        buffer[index / 8] &= !(1 << (index % 8));
    }
}

fn bits_fit(buffer: Option<&[u8]>, num_bits: usize) -> bool {
    buffer.map_or(true, |b| b.len() * 8 >= num_bits)
}

impl<C: AdapterChannel> CjtagLink<C> {
    /// Deferred-read variant of `transitions`: OSCAN1 cycles only, no
    /// terminal read. The response bytes stay queued in the adapter and
    /// `tx_bit_count` accumulates so the scan's single read can skip them.
    fn shift_transitions(&mut self, tms_values: &str) -> Result<()> {
        let mut buffer = Vec::with_capacity(tms_values.len() * OSCAN1_CYCLE_LEN);

        for c in tms_values.chars() {
            if c == '_' || c == ' ' {
                continue;
            }
            let tms = c == '1';

            self.tx_bit_count += 1;
            self.tap.consume(&tms).unwrap();
            buffer.extend_from_slice(&oscan1_cycle_bytes(tms, false));
        }

        self.channel.write(&buffer)
    }

    /// Move the TAP between the states the scan path needs. Pairs outside
    /// the table emit nothing; the tracked state is set to `goal` either
    /// way.
    pub(crate) fn move_to_state(&mut self, goal: TapState) -> Result<()> {
        let tms_values = match (self.tap_state(), goal) {
            (TapState::RunIdle, TapState::ShiftDR) => "100",
            (TapState::RunIdle, TapState::ShiftIR) => "1100",
            (TapState::PauseDR, TapState::ShiftDR) => "10",
            (TapState::PauseDR, TapState::ShiftIR) => "111100",
            (TapState::PauseIR, TapState::ShiftDR) => "11100",
            (TapState::PauseIR, TapState::ShiftIR) => "10",
            (TapState::Exit1IR, TapState::PauseIR) => "0",
            (TapState::Exit1IR, TapState::RunIdle) => "10",
            (TapState::Exit1DR, TapState::PauseDR) => "0",
            (TapState::Exit1DR, TapState::RunIdle) => "10",
            (_, _) => "",
        };

        if !tms_values.is_empty() {
            self.shift_transitions(tms_values)?;
        }
        self.tap = StateMachine::from_state(goal);
        Ok(())
    }

    /// Perform one IR/DR scan: navigate to the shift state, clock the
    /// payload bits (final bit with TMS high), navigate to the requested end
    /// state, then read every queued response byte in one transaction and
    /// extract the captured bits from behind the preamble cycles.
    ///
    /// Malformed requests are logged and rejected without bus traffic.
    pub fn execute_scan(&mut self, request: ScanRequest<'_>) -> Result<()> {
        let ScanRequest {
            ir_scan,
            num_bits,
            out_value,
            in_value,
            end_state,
        } = request;

        if num_bits == 0 {
            error!("rejecting empty scan");
            return Ok(());
        }
        if num_bits + MAX_PREAMBLE + MAX_POSTAMBLE > MAX_SUPPORTED_SCAN_LENGTH {
            error!("scan length too long at {}", num_bits);
            return Ok(());
        }
        if !bits_fit(out_value, num_bits) || !bits_fit(in_value.as_deref(), num_bits) {
            error!("scan buffer shorter than {} bits", num_bits);
            return Ok(());
        }

        self.tx_bit_count = 0;

        let shift_state = if ir_scan {
            TapState::ShiftIR
        } else {
            TapState::ShiftDR
        };
        if self.tap_state() != shift_state {
            self.move_to_state(shift_state)?;
        }
        let preamble = self.tx_bit_count;

        for i in 0..num_bits {
            let mut cycle = CycleBits::empty();
            if out_value.map_or(false, |v| bit(v, i)) {
                cycle |= CycleBits::TDI;
            }
            if i == num_bits - 1 {
                // final bit exits the shift state
                cycle |= CycleBits::TMS;
            }
            self.send_jtag(cycle)?;
        }

        self.move_to_state(end_state)?;

        let total = num_bits + self.tx_bit_count;
        self.channel.read(&mut self.rx_buffer[..total])?;

        if let Some(in_value) = in_value {
            for i in 0..num_bits {
                let sampled = self.rx_buffer[i + preamble] & (1 << TDO_SAMPLE_BIT) != 0;
                set_bit(in_value, i, sampled);
            }
        }
        Ok(())
    }
}
