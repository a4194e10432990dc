// tests/hardware_tests.rs
//
// These need an MVLC attached via USB and permission to open it (see the
// udev notes in the crate docs). Run with `cargo test -- --ignored`.

use mvlc_usb::{
    device_info_list, ConnectMode, Driver, Ft60xDriver, ListOptions, Pipe, PipeMode, Result,
    TransportConfig, UsbTransport,
};

fn open_test_transport(pipe_mode: PipeMode) -> UsbTransport {
    let _ = env_logger::builder().is_test(true).try_init();
    let driver = Ft60xDriver::new().expect("Failed to create libusb context");
    let config = TransportConfig::default()
        .with_pipe_mode(pipe_mode)
        .with_disable_triggers_on_connect(false);
    let mut transport = UsbTransport::with_config(driver, ConnectMode::First, config);
    transport
        .open()
        .expect("Failed to open MVLC. Is it connected and permissions set?");
    transport
}

#[test]
fn test_enumerate_no_panic() {
    // Works with or without hardware; a host without USB access just skips.
    let driver = match Ft60xDriver::new() {
        Ok(driver) => driver,
        Err(e) => {
            println!("Skipping: no libusb context ({})", e);
            return;
        }
    };
    println!("libusb version {}", driver.library_version());
    match device_info_list(&driver, ListOptions::AllDevices) {
        Ok(devices) => {
            for (i, info) in devices.iter().enumerate() {
                println!("{}", info);
                assert_eq!(info.index as usize, i);
            }
        }
        Err(e) => println!("Skipping: enumeration failed ({})", e),
    }
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_open_close_reopen() -> Result<()> {
    let mut transport = open_test_transport(PipeMode::platform_default());
    println!("Connected: {}", transport.connection_info());
    assert!(transport.is_connected());

    transport.close()?;
    assert!(!transport.is_connected());
    transport.open()?;
    assert!(transport.is_connected());
    Ok(())
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_idle_data_pipe_times_out() -> Result<()> {
    let transport = open_test_transport(PipeMode::PassThrough);
    let mut buf = vec![0u8; 1024];

    // Drain anything left over from a previous run first.
    while let Ok(n) = transport.read_unbuffered(Pipe::Data, &mut buf) {
        if n == 0 {
            break;
        }
    }

    match transport.read_unbuffered(Pipe::Data, &mut buf) {
        Ok(n) => assert_eq!(n, 0, "idle MVLC sent {} data bytes", n),
        Err(e) => assert!(e.is_timeout(), "unexpected error: {}", e),
    }
    Ok(())
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_open_unknown_serial_fails() {
    let _ = env_logger::builder().is_test(true).try_init();
    let driver = Ft60xDriver::new().expect("Failed to create libusb context");
    let mut transport = UsbTransport::new(driver, ConnectMode::BySerial("no-such-mvlc".into()));
    let err = transport.open().unwrap_err();
    assert!(err.is_connection_error());
    assert!(!transport.is_connected());
}
