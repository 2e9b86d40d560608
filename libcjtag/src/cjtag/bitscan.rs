use anyhow::Result;

use crate::adapter::AdapterChannel;
use crate::cjtag::encoder::{oscan1_cycle_bytes, OSCAN1_CYCLE_LEN};
use crate::cjtag::link::CjtagLink;
use crate::cjtag::MAX_BIT_SCAN_COUNT;

impl<C: AdapterChannel> CjtagLink<C> {
    /// Execute a string of TMS transitions with TDI held low. `'_'` and
    /// `' '` are ignored separators. The per-cycle encoding depends on the
    /// scan format and the want-result flag; the response bytes are read
    /// back at the end of the call.
    pub(crate) fn transitions(&mut self, tms_values: &str) -> Result<()> {
        let mut buffer = Vec::with_capacity(tms_values.len() * OSCAN1_CYCLE_LEN + 2);

        self.tx_bit_count = 0;
        for c in tms_values.chars() {
            if c == '_' || c == ' ' {
                continue;
            }
            let tms = c == '1';

            self.tx_bit_count += 1;
            self.tap.consume(&tms).unwrap();

            if self.in_normal_scan_mode() {
                let opcode = if self.want_result { 0x6F } else { 0x4B };
                buffer.extend_from_slice(&[opcode, 0x00, u8::from(tms)]);
            } else {
                buffer.extend_from_slice(&oscan1_cycle_bytes(tms, false));
            }
        }

        if !self.want_result && self.in_normal_scan_mode() {
            // Discard-one-byte pattern: flush and pull a single byte.
            buffer.extend_from_slice(&[0x81, 0x87]);
            self.channel.write_then_read(&buffer, &mut self.rx_buffer[..1])
        } else {
            buffer.push(0x87);
            let count = self.tx_bit_count;
            self.channel
                .write_then_read(&buffer, &mut self.rx_buffer[..count])
        }
    }

    /// Zero-bit scan: transmit the value `repeat` as that many capture-DR
    /// touches with no shift, from idle and back to idle.
    pub(crate) fn zero_bit_scan(&mut self, repeat: usize) -> Result<()> {
        assert!(
            repeat <= MAX_BIT_SCAN_COUNT,
            "zero-bit-scan repeat {} exceeds {}",
            repeat,
            MAX_BIT_SCAN_COUNT
        );

        let mut tms_values = String::with_capacity(repeat * 5 + 1);
        for _ in 0..repeat {
            // enter capture-DR, then exit and update
            tms_values.push_str("10");
            tms_values.push_str("11_");
        }
        // back to RTI
        tms_values.push('0');

        self.transitions(&tms_values)
    }

    /// Non-zero-bit scan: transmit the value `amount` as that many trips
    /// around shift-DR, from idle and back to idle. Must never route through
    /// Test-Logic-Reset; that desynchronizes the router.
    pub(crate) fn non_zero_bit_scan(&mut self, amount: usize) -> Result<()> {
        assert!(
            amount <= MAX_BIT_SCAN_COUNT,
            "non-zero-bit-scan amount {} exceeds {}",
            amount,
            MAX_BIT_SCAN_COUNT
        );

        // enter capture-DR; each touch of shift-DR counts as one
        let mut tms_values = String::with_capacity(amount + 7);
        tms_values.push_str("10_");
        for _ in 0..amount {
            tms_values.push('0');
        }
        // exit, update, back to RTI
        tms_values.push_str("_110");

        self.transitions(&tms_values)
    }

    /// Enter and lock a 1149.7 control level: select it with a zero-bit
    /// scan, lock it with a one-count non-zero-bit scan, then three trips
    /// around RTI.
    pub(crate) fn enter_control_mode(&mut self, level: usize) -> Result<()> {
        self.zero_bit_scan(level)?;
        self.non_zero_bit_scan(1)?;
        self.transitions("000")
    }

    /// Generic two-operand star-command framing (STFMT, STMC, ...). In
    /// OSCAN1 the command is sealed with a check packet.
    pub(crate) fn send_two_part_command(&mut self, opcode: usize, operand: usize) -> Result<()> {
        self.non_zero_bit_scan(opcode)?;
        self.non_zero_bit_scan(operand)?;

        if !self.in_normal_scan_mode() {
            self.check_packet()?;
        }
        Ok(())
    }
}
