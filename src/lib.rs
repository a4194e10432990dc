//! # mvlc-usb
//!
//! USB transport for the mesytec MVLC VME controller.
//!
//! The MVLC connects to the host through an FTDI FT60x USB3 FIFO bridge that
//! exposes two independent pipes: a low-volume **command** pipe and a
//! high-volume **data** pipe carrying streaming readout. This crate opens the
//! bridge, validates its chip configuration, moves opaque bytes over the two
//! pipes and runs the startup handshake that brings a controller left in
//! acquisition mode back to a quiet state. Higher-level MVLC command framing
//! is out of scope.
//!
//! The native driver is abstracted behind the [`Driver`] and
//! [`NativeHandle`] traits. [`Ft60xDriver`] is the default implementation,
//! built on libusb via the `rusb` crate.
//!
//! ## Features
//!
//! *   Device discovery (`device_info_list`, `device_info_by_serial`, `device_info_by_index`).
//! *   Connecting by first device, driver index or serial number (`ConnectMode`).
//! *   Chip configuration check on connect (FIFO clock, FIFO mode, channel setup, power attributes).
//! *   Pipe I/O with partial-transfer reporting (`write`, `read`, `read_unbuffered`):
//!     *   Buffered reads for drivers that discard unread bytes (`PipeMode::Buffered`).
//!     *   Direct reads for drivers that keep them (`PipeMode::PassThrough`).
//! *   Driver status codes with names and a transport-agnostic error category (`FtStatus`, `ErrorType`).
//! *   Post-connect handshake disabling triggers while draining stale readout data (`TriggerDisabler`).
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! mvlc-usb = "0.1.0" # Replace with the latest version
//! log = "0.4"        # Optional, for logging
//!
//! [dev-dependencies] # For demos/tests
//! env_logger = "0.11"
//! ```
//!
//! `rusb` links against libusb-1.0, which must be available on the system.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use mvlc_usb::{
//!     CommandPipe, ConnectMode, Ft60xDriver, Pipe, Result, TransportConfig, UsbTransport,
//! };
//!
//! fn disable_triggers(pipe: &CommandPipe<'_>) -> Result<()> {
//!     // Encode and send the controller's "disable triggers" command here.
//!     pipe.write(&[0xF1, 0x00, 0x00, 0x00])?;
//!     Ok(())
//! }
//!
//! fn main() -> Result<()> {
//!     // Optional: Initialize logging
//!     // env_logger::init();
//!
//!     let driver = Ft60xDriver::new()?;
//!     let mut transport = UsbTransport::with_config(
//!         driver,
//!         ConnectMode::BySerial("02220042".to_string()),
//!         TransportConfig::default(),
//!     )
//!     .with_trigger_disabler(disable_triggers);
//!
//!     transport.open()?;
//!     println!("Connected: {}", transport.connection_info());
//!
//!     let mut buf = vec![0u8; 8192];
//!     match transport.read_unbuffered(Pipe::Data, &mut buf) {
//!         Ok(n) => println!("received {} bytes", n),
//!         Err(e) if e.is_timeout() => println!("no data ({} bytes)", e.transferred),
//!         Err(e) => return Err(e.error),
//!     }
//!
//!     transport.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Threading
//!
//! Pipe I/O takes `&self`. One thread may use the command pipe while another
//! reads the data pipe; use of the same pipe from several threads at once is
//! not supported.
//!
//! ## Hardware Setup Notes
//!
//! *   **Linux udev Rules:** Grant user permission to the FT60x. Create `/etc/udev/rules.d/99-mvlc.rules`:
//!     ```udev
//!     # FTDI FT600/FT601 (MVLC USB)
//!     SUBSYSTEM=="usb", ATTRS{idVendor}=="0403", ATTRS{idProduct}=="601e", MODE="0666", GROUP="plugdev"
//!     SUBSYSTEM=="usb", ATTRS{idVendor}=="0403", ATTRS{idProduct}=="601f", MODE="0666", GROUP="plugdev"
//!     ```
//!     Reload: `sudo udevadm control --reload-rules && sudo udevadm trigger`
//!
//! ## License
//!
//! This project is licensed under the WTFPL - see the [LICENSE](LICENSE) file for details.

mod buffer;
mod consts;
pub mod device;
pub mod driver;
mod error;
pub mod ft60x;
mod io;
pub mod pipe;
mod startup;
pub mod status;
mod transport;

pub use device::{
    device_info_by_index, device_info_by_serial, device_info_list, DeviceFlags, DeviceInfo,
    ListOptions,
};
pub use driver::{
    check_chip_configuration, ChipConfiguration, Driver, NativeHandle, NativeTransfer, Version,
};
pub use error::{Error, Result, TransferError, TransferResult};
pub use ft60x::{Ft60xDriver, Ft60xHandle};
pub use pipe::{EndpointDirection, Pipe, PipeMode};
pub use startup::{CommandPipe, TriggerDisabler};
pub use status::{ErrorType, FtStatus};
pub use transport::{ConnectMode, TransportConfig, UsbTransport};

pub use consts::{
    DEFAULT_DRAIN_BUDGET, DISABLE_TRIGGER_RETRY_COUNT, FT600_PID, FT601_PID, FTDI_VID,
    MAX_OPEN_ATTEMPTS, MVLC_DESCRIPTION_MARKER, READ_TIMEOUT, USB_SINGLE_TRANSFER_MAX_BYTES,
    USB_STREAM_PIPE_READ_SIZE, WRITE_TIMEOUT,
};
