pub mod adapter;
pub mod cjtag;

#[cfg(feature = "std")]
pub use crate::adapter::ftdi_mpsse;
