//! Lists the FT60x devices visible to libusb and marks the MVLCs among them.
//!
//! Run with: cargo run --example list_devices

use mvlc_usb::{device_info_list, Driver, Ft60xDriver, ListOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let driver = Ft60xDriver::new()?;
    println!("libusb version: {}", driver.library_version());
    println!();

    let devices = device_info_list(&driver, ListOptions::AllDevices)?;
    if devices.is_empty() {
        println!("No FT60x devices found.");
        return Ok(());
    }

    for info in &devices {
        println!("Device [{}]:", info.index);
        println!("  Serial:      {}", info.serial);
        println!("  Description: {}", info.description);
        println!("  Speed:       {}", info.speed_name());
        println!("  Opened:      {}", info.is_opened());
        println!("  MVLC:        {}", info.is_mvlc());
        println!();
    }

    Ok(())
}
