//! FT600/FT601 driver backend on top of libusb (`rusb`).
//!
//! Talks to the bridge the way the vendor's D3XX library does on Linux:
//! interfaces 0 and 1 are claimed, the chip configuration is fetched with a
//! vendor control request and every bulk IN transfer of a non-streaming
//! pipe is announced by a read request on the session endpoint.

use crate::consts::{self, chip, endpoint, session};
use crate::device::{DeviceFlags, DeviceInfo};
use crate::driver::{ChipConfiguration, Driver, NativeHandle, NativeTransfer, Version};
use crate::error::{Error, Result};
use crate::pipe::{EndpointDirection, Pipe, PIPE_COUNT};
use crate::status::FtStatus;
use log::{debug, trace, warn};
use rusb::{Context, Device, DeviceHandle, Speed, UsbContext};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Maps libusb errors onto the FT status codes used by the transport.
pub fn map_rusb_error(err: rusb::Error) -> FtStatus {
    match err {
        rusb::Error::Timeout => FtStatus::TIMEOUT,
        rusb::Error::NoDevice => FtStatus::DEVICE_NOT_CONNECTED,
        rusb::Error::NotFound => FtStatus::DEVICE_NOT_FOUND,
        rusb::Error::Busy => FtStatus::BUSY,
        rusb::Error::Access => FtStatus::DEVICE_NOT_OPENED,
        rusb::Error::Io | rusb::Error::Pipe => FtStatus::IO_ERROR,
        rusb::Error::InvalidParam => FtStatus::INVALID_PARAMETER,
        rusb::Error::Overflow => FtStatus::IO_INCOMPLETE,
        rusb::Error::NoMem => FtStatus::INSUFFICIENT_RESOURCES,
        rusb::Error::NotSupported => FtStatus::NOT_SUPPORTED,
        rusb::Error::Interrupted => FtStatus::OPERATION_ABORTED,
        _ => FtStatus::OTHER_ERROR,
    }
}

fn is_ft60x(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == consts::FTDI_VID
        && (product_id == consts::FT600_PID || product_id == consts::FT601_PID)
}

/// libusb based FT60x driver.
pub struct Ft60xDriver {
    context: Context,
}

impl Ft60xDriver {
    pub fn new() -> Result<Self> {
        let context = Context::new().map_err(|e| Error::Status(map_rusb_error(e)))?;
        Ok(Self { context })
    }

    fn ft60x_devices(&self) -> std::result::Result<Vec<Device<Context>>, FtStatus> {
        let devices = self.context.devices().map_err(map_rusb_error)?;
        Ok(devices
            .iter()
            .filter(|dev| {
                dev.device_descriptor()
                    .map(|desc| is_ft60x(desc.vendor_id(), desc.product_id()))
                    .unwrap_or(false)
            })
            .collect())
    }

    fn describe(index: u32, device: &Device<Context>) -> std::result::Result<DeviceInfo, FtStatus> {
        let desc = device.device_descriptor().map_err(map_rusb_error)?;

        let mut flags = match device.speed() {
            Speed::High => DeviceFlags::USB2,
            Speed::Super | Speed::SuperPlus => DeviceFlags::USB3,
            _ => DeviceFlags::empty(),
        };

        // Strings need an open handle. A device we cannot open is most
        // likely held by another process.
        let (description, serial) = match device.open() {
            Ok(handle) => (
                handle.read_product_string_ascii(&desc).unwrap_or_default(),
                handle
                    .read_serial_number_string_ascii(&desc)
                    .unwrap_or_default(),
            ),
            Err(e) => {
                debug!(
                    "cannot open bus={} addr={} for strings: {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
                flags |= DeviceFlags::OPENED;
                (String::new(), String::new())
            }
        };

        Ok(DeviceInfo {
            index,
            serial,
            description,
            flags,
            native_id: (u64::from(device.bus_number()) << 8) | u64::from(device.address()),
        })
    }
}

impl Driver for Ft60xDriver {
    type Handle = Ft60xHandle;

    fn device_list(&self) -> std::result::Result<Vec<DeviceInfo>, FtStatus> {
        self.ft60x_devices()?
            .iter()
            .enumerate()
            .map(|(index, device)| Self::describe(index as u32, device))
            .collect()
    }

    fn create(&self, index: u32) -> std::result::Result<Ft60xHandle, FtStatus> {
        let device = self
            .ft60x_devices()?
            .into_iter()
            .nth(index as usize)
            .ok_or(FtStatus::DEVICE_NOT_FOUND)?;

        let handle = device.open().map_err(map_rusb_error)?;

        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            trace!("auto detach of kernel driver not available: {}", e);
        }
        for interface in session::INTERFACES {
            handle.claim_interface(interface).map_err(|e| {
                warn!("claiming interface {} failed: {}", interface, e);
                map_rusb_error(e)
            })?;
        }

        debug!(
            "opened FT60x at bus={} addr={}",
            device.bus_number(),
            device.address()
        );

        Ok(Ft60xHandle {
            handle,
            timeouts_ms: Default::default(),
            streaming: AtomicBool::new(false),
            request_index: AtomicU32::new(0),
        })
    }

    fn library_version(&self) -> Version {
        let v = rusb::version();
        Version {
            major: v.major() as u8,
            minor: v.minor() as u8,
            build: v.micro(),
        }
    }
}

/// Encodes a session request for the given endpoint.
fn session_request(idx: u32, ep: u8, cmd: u8, len: u32) -> [u8; session::REQUEST_SIZE] {
    let mut req = [0u8; session::REQUEST_SIZE];
    req[0..4].copy_from_slice(&idx.to_le_bytes());
    req[4] = ep;
    req[5] = cmd;
    req[8..12].copy_from_slice(&len.to_le_bytes());
    req
}

/// Open FT60x device.
pub struct Ft60xHandle {
    handle: DeviceHandle<Context>,
    // Per pipe and direction, in milliseconds.
    timeouts_ms: [AtomicU64; PIPE_COUNT * 2],
    streaming: AtomicBool,
    request_index: AtomicU32,
}

impl Ft60xHandle {
    fn timeout_slot(pipe: Pipe, dir: EndpointDirection) -> usize {
        pipe.index() * 2
            + match dir {
                EndpointDirection::In => 0,
                EndpointDirection::Out => 1,
            }
    }

    fn timeout(&self, pipe: Pipe, dir: EndpointDirection) -> Duration {
        let ms = self.timeouts_ms[Self::timeout_slot(pipe, dir)].load(Ordering::Relaxed);
        // libusb treats 0 as "wait forever"; poll for 1 ms instead.
        Duration::from_millis(ms.max(1))
    }

    fn send_session_request(
        &self,
        ep: u8,
        cmd: u8,
        len: u32,
    ) -> std::result::Result<(), FtStatus> {
        let idx = self.request_index.fetch_add(1, Ordering::Relaxed);
        let req = session_request(idx, ep, cmd, len);

        trace!("session request: ep={:#04x}, cmd={}, len={}", ep, cmd, len);
        self.handle
            .write_bulk(endpoint::SESSION_OUT, &req, consts::WRITE_TIMEOUT)
            .map_err(map_rusb_error)
            .and_then(|n| {
                if n == req.len() {
                    Ok(())
                } else {
                    Err(FtStatus::IO_INCOMPLETE)
                }
            })
    }
}

impl NativeHandle for Ft60xHandle {
    fn chip_configuration(&self) -> std::result::Result<ChipConfiguration, FtStatus> {
        let mut raw = [0u8; chip::CONFIGURATION_SIZE];
        let n = self
            .handle
            .read_control(
                chip::REQUEST_TYPE_VENDOR_IN,
                chip::REQUEST_GET_CONFIGURATION,
                chip::VALUE_GET_CONFIGURATION,
                0,
                &mut raw,
                consts::READ_TIMEOUT,
            )
            .map_err(map_rusb_error)?;
        ChipConfiguration::from_bytes(&raw[..n]).ok_or(FtStatus::IO_INCOMPLETE)
    }

    fn set_pipe_timeout(
        &self,
        pipe: Pipe,
        dir: EndpointDirection,
        timeout: Duration,
    ) -> std::result::Result<(), FtStatus> {
        let ms = u64::try_from(timeout.as_millis()).map_err(|_| FtStatus::INVALID_PARAMETER)?;
        self.timeouts_ms[Self::timeout_slot(pipe, dir)].store(ms, Ordering::Relaxed);
        Ok(())
    }

    fn set_stream_pipe(&self, stream_size: usize) -> std::result::Result<(), FtStatus> {
        let len = u32::try_from(stream_size).map_err(|_| FtStatus::INVALID_PARAMETER)?;
        for pipe in Pipe::ALL {
            self.send_session_request(
                pipe.endpoint(EndpointDirection::In),
                session::CMD_STREAM,
                len,
            )?;
        }
        self.streaming.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn write_pipe(&self, pipe: Pipe, data: &[u8]) -> NativeTransfer {
        let timeout = self.timeout(pipe, EndpointDirection::Out);
        match self
            .handle
            .write_bulk(pipe.endpoint(EndpointDirection::Out), data, timeout)
        {
            Ok(n) => NativeTransfer::ok(n),
            Err(e) => NativeTransfer::failed(0, map_rusb_error(e)),
        }
    }

    fn read_pipe(&self, pipe: Pipe, buf: &mut [u8]) -> NativeTransfer {
        if !self.streaming.load(Ordering::Relaxed) {
            let len = match u32::try_from(buf.len()) {
                Ok(len) => len,
                Err(_) => return NativeTransfer::failed(0, FtStatus::INVALID_PARAMETER),
            };
            if let Err(st) = self.send_session_request(
                pipe.endpoint(EndpointDirection::In),
                session::CMD_READ,
                len,
            ) {
                return NativeTransfer::failed(0, st);
            }
        }

        let timeout = self.timeout(pipe, EndpointDirection::In);
        match self
            .handle
            .read_bulk(pipe.endpoint(EndpointDirection::In), buf, timeout)
        {
            Ok(n) => NativeTransfer::ok(n),
            Err(e) => NativeTransfer::failed(0, map_rusb_error(e)),
        }
    }

    fn abort_pipe(&self, pipe: Pipe, dir: EndpointDirection) -> std::result::Result<(), FtStatus> {
        trace!("abort: pipe={}, dir={}", pipe, dir);
        let ep = pipe.endpoint(dir);
        self.send_session_request(ep, session::CMD_ABORT, 0)?;
        self.handle.clear_halt(ep).map_err(map_rusb_error)
    }

    fn close(self) -> std::result::Result<(), FtStatus> {
        let mut result = Ok(());
        for interface in session::INTERFACES {
            if let Err(e) = self.handle.release_interface(interface) {
                debug!("releasing interface {} failed: {}", interface, e);
                result = Err(map_rusb_error(e));
            }
        }
        result
    }
}
