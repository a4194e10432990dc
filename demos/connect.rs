//! Connects to an MVLC, optionally by serial number, and counts what the data
//! pipe delivers for a few seconds.
//!
//! Run with: cargo run --example connect -- [SERIAL]

use mvlc_usb::{ConnectMode, Ft60xDriver, Pipe, Result, TransportConfig, UsbTransport};
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mode = match std::env::args().nth(1) {
        Some(serial) => ConnectMode::BySerial(serial),
        None => ConnectMode::First,
    };

    // Disabling triggers needs the controller's command framing, which lives
    // above this crate; connect without the startup handshake.
    let config = TransportConfig::default().with_disable_triggers_on_connect(false);
    let driver = Ft60xDriver::new()?;
    let mut transport = UsbTransport::with_config(driver, mode, config);

    if let Err(e) = transport.open() {
        eprintln!("Error opening MVLC: {}", e);
        eprintln!("Ensure the device is connected and permissions are set (udev rules on Linux).");
        return Err(e);
    }
    println!("Connected: {}", transport.connection_info());

    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0usize;
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(3) {
        match transport.read_unbuffered(Pipe::Data, &mut buf) {
            Ok(n) => total += n,
            Err(e) if e.is_timeout() => total += e.transferred,
            Err(e) => {
                eprintln!("Data pipe read failed: {}", e);
                break;
            }
        }
    }
    println!("Read {} bytes from the data pipe in {:?}", total, start.elapsed());

    transport.close()?;
    Ok(())
}
