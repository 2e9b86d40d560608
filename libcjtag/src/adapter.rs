use anyhow::Result;

#[cfg(feature = "std")]
pub mod ftdi_mpsse;

/// Byte channel to the adapter's bit-bang engine. Writes and reads are
/// ordered and reliable; the protocol layer above builds raw command bytes
/// and expects one response byte per sampled cycle.
pub trait AdapterChannel {
    fn write(&mut self, data: &[u8]) -> Result<()>;
    fn read(&mut self, buffer: &mut [u8]) -> Result<()>;
    fn write_then_read(&mut self, data: &[u8], buffer: &mut [u8]) -> Result<()> {
        self.write(data)?;
        self.read(buffer)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::AdapterChannel;
    use anyhow::Result;

    /// Records every written byte and serves response bytes from a pattern
    /// function of the read-relative byte index.
    pub struct MockChannel {
        pub written: Vec<u8>,
        pub response: Box<dyn FnMut(usize) -> u8>,
        pub last_read_len: usize,
    }

    impl MockChannel {
        pub fn new() -> Self {
            Self::with_response(|_| 0)
        }

        pub fn with_response(response: impl FnMut(usize) -> u8 + 'static) -> Self {
            MockChannel {
                written: Vec::new(),
                response: Box::new(response),
                last_read_len: 0,
            }
        }
    }

    impl AdapterChannel for MockChannel {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.written.extend_from_slice(data);
            Ok(())
        }

        fn read(&mut self, buffer: &mut [u8]) -> Result<()> {
            self.last_read_len = buffer.len();
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = (self.response)(i);
            }
            Ok(())
        }
    }
}
