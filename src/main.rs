use anyhow::Result;
use log::info;

use libcjtag::cjtag::link::CjtagLink;
use libcjtag::cjtag::scan::ScanRequest;
use libcjtag::cjtag::tap::TapState;
use libcjtag::ftdi_mpsse::FtdiChannel;

// Digilent HS-2 (FT232H)
const FTDI_VID: u16 = 0x0403;
const FTDI_PID: u16 = 0x6014;

fn setup_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        // per-bit TAP tracking is too chatty even for debug runs
        .filter(|meta| !meta.target().contains("cjtag::tap"))
        .apply()?;
    Ok(())
}

fn main() -> Result<()> {
    setup_logger().expect("logger setup");

    let channel = FtdiChannel::new(FTDI_VID, FTDI_PID)?;
    let mut link = CjtagLink::new(channel);
    link.initialize()?;

    // IDCODE is the capture default, so an empty 32-bit DR scan reads it.
    let out = [0u8; 4];
    let mut idcode = [0u8; 4];
    link.execute_scan(ScanRequest {
        ir_scan: false,
        num_bits: 32,
        out_value: Some(&out),
        in_value: Some(&mut idcode),
        end_state: TapState::RunIdle,
    })?;
    info!("idcode: {:#010x}", u32::from_le_bytes(idcode));

    Ok(())
}
