//! Connection lifecycle of the USB transport.

use crate::buffer::ReadBuffer;
use crate::consts;
use crate::device::{self, DeviceInfo, ListOptions};
use crate::driver::{check_chip_configuration, Driver, NativeHandle};
use crate::error::{Error, Result};
use crate::ft60x::Ft60xDriver;
use crate::pipe::{EndpointDirection, Pipe, PipeMode, PIPE_COUNT};
use crate::startup::{self, TriggerDisabler};
use crate::status::FtStatus;
use log::{debug, info, trace, warn};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Selects which device `open()` connects to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectMode {
    /// The first MVLC reported by the driver.
    #[default]
    First,
    /// The MVLC with the given driver index.
    ByIndex(u32),
    /// The MVLC with the given serial number.
    BySerial(String),
}

impl fmt::Display for ConnectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectMode::First => f.write_str("first device"),
            ConnectMode::ByIndex(index) => write!(f, "index={}", index),
            ConnectMode::BySerial(serial) => write!(f, "serial={}", serial),
        }
    }
}

/// Construction-time settings of a [`UsbTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Read strategy; defaults to the host platform's driver semantics.
    pub pipe_mode: PipeMode,
    /// Run the startup handshake that disables triggers and drains stale
    /// readout data after connecting.
    pub disable_triggers_on_connect: bool,
    /// Wall-clock limit for draining the data pipe during the handshake.
    pub drain_budget: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            pipe_mode: PipeMode::platform_default(),
            disable_triggers_on_connect: true,
            drain_budget: consts::DEFAULT_DRAIN_BUDGET,
        }
    }
}

impl TransportConfig {
    pub fn with_pipe_mode(mut self, pipe_mode: PipeMode) -> Self {
        self.pipe_mode = pipe_mode;
        self
    }

    pub fn with_disable_triggers_on_connect(mut self, enable: bool) -> Self {
        self.disable_triggers_on_connect = enable;
        self
    }

    pub fn with_drain_budget(mut self, budget: Duration) -> Self {
        self.drain_budget = budget;
        self
    }
}

/// USB transport to an MVLC: owns the native handle and the two pipes.
///
/// The transport is either disconnected or holds exactly one open native
/// handle. The handle is closed by [`close`](Self::close), by a failed
/// [`open`](Self::open) and on drop.
///
/// Pipe I/O takes `&self`. Using the Command and Data pipes from two threads
/// at the same time is supported; concurrent use of the *same* pipe from
/// several threads is not.
pub struct UsbTransport<D: Driver = Ft60xDriver> {
    driver: D,
    connect_mode: ConnectMode,
    config: TransportConfig,
    handle: Option<D::Handle>,
    device_info: Option<DeviceInfo>,
    read_buffers: [Mutex<ReadBuffer>; PIPE_COUNT],
    trigger_disabler: Option<Box<dyn TriggerDisabler>>,
}

impl UsbTransport<Ft60xDriver> {
    /// Opens the first MVLC found using the libusb backend.
    pub fn open_first() -> Result<Self> {
        Self::open_with_mode(ConnectMode::First)
    }

    /// Opens the MVLC at the given driver index using the libusb backend.
    pub fn open_by_index(index: u32) -> Result<Self> {
        Self::open_with_mode(ConnectMode::ByIndex(index))
    }

    /// Opens the MVLC with the given serial number using the libusb backend.
    pub fn open_by_serial(serial: &str) -> Result<Self> {
        Self::open_with_mode(ConnectMode::BySerial(serial.to_string()))
    }

    // The startup handshake needs a trigger disabler, which these plain
    // constructors don't have, so it is switched off.
    fn open_with_mode(mode: ConnectMode) -> Result<Self> {
        let config = TransportConfig::default().with_disable_triggers_on_connect(false);
        let mut transport = Self::with_config(Ft60xDriver::new()?, mode, config);
        transport.open()?;
        Ok(transport)
    }
}

impl<D: Driver> UsbTransport<D> {
    // --- Constructors and Info ---

    /// Creates a disconnected transport with the default configuration.
    pub fn new(driver: D, connect_mode: ConnectMode) -> Self {
        Self::with_config(driver, connect_mode, TransportConfig::default())
    }

    pub fn with_config(driver: D, connect_mode: ConnectMode, config: TransportConfig) -> Self {
        // Pass-through reads never touch the retained buffers.
        let capacity = match config.pipe_mode {
            PipeMode::Buffered => consts::USB_STREAM_PIPE_READ_SIZE,
            PipeMode::PassThrough => 0,
        };
        Self {
            driver,
            connect_mode,
            config,
            handle: None,
            device_info: None,
            read_buffers: std::array::from_fn(|_| Mutex::new(ReadBuffer::new(capacity))),
            trigger_disabler: None,
        }
    }

    /// Installs the command used by the startup handshake to disable all
    /// triggers over the command pipe.
    pub fn with_trigger_disabler(mut self, disabler: impl TriggerDisabler + 'static) -> Self {
        self.set_trigger_disabler(disabler);
        self
    }

    pub fn set_trigger_disabler(&mut self, disabler: impl TriggerDisabler + 'static) {
        self.trigger_disabler = Some(Box::new(disabler));
    }

    pub fn connect_mode(&self) -> &ConnectMode {
        &self.connect_mode
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn disable_triggers_on_connect(&self) -> bool {
        self.config.disable_triggers_on_connect
    }

    pub fn set_disable_triggers_on_connect(&mut self, enable: bool) {
        self.config.disable_triggers_on_connect = enable;
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// The native handle while connected.
    pub fn handle(&self) -> Option<&D::Handle> {
        self.handle.as_ref()
    }

    /// Info about the device most recently connected to.
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    /// Link speed and serial of the connected device, e.g.
    /// `"speed=USB3, serial=02220042"`.
    pub fn connection_info(&self) -> String {
        match &self.device_info {
            Some(info) => format!("speed={}, serial={}", info.speed_name(), info.serial),
            None => "speed=unknown, serial=".to_string(),
        }
    }

    // --- Lifecycle ---

    /// Connects to the device selected by the connect mode.
    ///
    /// On any failure the handle is closed again and the transport stays
    /// disconnected.
    pub fn open(&mut self) -> Result<()> {
        trace!("begin open ({})", self.connect_mode);

        if self.is_connected() {
            return Err(Error::IsConnected);
        }

        let (handle, info) = self.create_handle()?;
        debug!("created native handle for {}", info);
        self.handle = Some(handle);
        self.device_info = Some(info);
        self.clear_read_buffers();

        if let Err(e) = self.setup_connection() {
            warn!("open failed, closing USB device: {}", e);
            if let Err(st) = self.close_handle() {
                warn!("closing USB device after failed open: {}", st);
            }
            return Err(e);
        }

        info!("opened USB device ({})", self.connection_info());
        Ok(())
    }

    /// Releases the native handle.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::IsDisconnected);
        }
        self.close_handle()?;
        debug!("closed USB device");
        Ok(())
    }

    fn create_handle(&self) -> Result<(D::Handle, DeviceInfo)> {
        let mut last_error = Error::DeviceNotFound;

        for attempt in 1..=consts::MAX_OPEN_ATTEMPTS {
            let result = self.resolve_device().and_then(|info| {
                self.driver
                    .create(info.index)
                    .map(|handle| (handle, info))
                    .map_err(Error::from)
            });

            match result {
                Ok(created) => return Ok(created),
                Err(e) => {
                    debug!(
                        "open attempt {}/{} failed: {}",
                        attempt,
                        consts::MAX_OPEN_ATTEMPTS,
                        e
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn resolve_device(&self) -> Result<DeviceInfo> {
        match &self.connect_mode {
            ConnectMode::First => device::device_info_list(&self.driver, ListOptions::MvlcDevices)?
                .into_iter()
                .next()
                .ok_or(Error::DeviceNotFound),
            ConnectMode::ByIndex(index) => device::device_info_by_index(&self.driver, *index)?
                .ok_or(Error::DeviceNotFoundByIndex { index: *index }),
            ConnectMode::BySerial(serial) => device::device_info_by_serial(&self.driver, serial)?
                .ok_or_else(|| Error::DeviceNotFoundBySerial {
                    serial: serial.clone(),
                }),
        }
    }

    // Everything after the native open. Any error here makes open() close
    // the handle again.
    fn setup_connection(&self) -> Result<()> {
        let handle = self.native()?;

        let conf = handle.chip_configuration()?;
        check_chip_configuration(&conf)?;
        trace!("chip configuration ok");

        // The command pipe read timeout is lowered again below in
        // pass-through mode; the handshake needs blocking reads.
        for pipe in Pipe::ALL {
            handle.set_pipe_timeout(pipe, EndpointDirection::In, consts::READ_TIMEOUT)?;
            handle.set_pipe_timeout(pipe, EndpointDirection::Out, consts::WRITE_TIMEOUT)?;
        }
        trace!("pipe timeouts set");

        if self.config.pipe_mode == PipeMode::Buffered {
            for pipe in Pipe::ALL {
                for dir in [EndpointDirection::In, EndpointDirection::Out] {
                    self.abort(pipe, dir)?;
                }
            }
            handle.set_stream_pipe(consts::USB_STREAM_PIPE_READ_SIZE)?;
            trace!(
                "pipes reset, streaming mode enabled (size={})",
                consts::USB_STREAM_PIPE_READ_SIZE
            );
        }

        if self.disable_triggers_on_connect() {
            match self.trigger_disabler.as_deref() {
                Some(disabler) => {
                    startup::post_connect_cleanup(self, disabler, self.config.drain_budget)?
                }
                None => warn!("trigger disable on connect requested but no trigger disabler set"),
            }
        }

        if self.config.pipe_mode == PipeMode::PassThrough {
            // Non-blocking command reads: only what the driver already holds.
            handle.set_pipe_timeout(Pipe::Command, EndpointDirection::In, Duration::ZERO)?;
            trace!("command pipe read timeout set to 0");
        }

        Ok(())
    }

    fn close_handle(&mut self) -> std::result::Result<(), FtStatus> {
        self.clear_read_buffers();
        self.device_info = None;
        match self.handle.take() {
            Some(handle) => handle.close(),
            None => Ok(()),
        }
    }

    fn clear_read_buffers(&self) {
        for pipe in Pipe::ALL {
            self.read_buffer(pipe).clear();
        }
    }

    // --- Crate internal access for the pipe I/O engine ---

    pub(crate) fn native(&self) -> std::result::Result<&D::Handle, FtStatus> {
        self.handle.as_ref().ok_or(FtStatus::INVALID_HANDLE)
    }

    pub(crate) fn read_buffer(&self, pipe: Pipe) -> MutexGuard<'_, ReadBuffer> {
        self.read_buffers[pipe.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<D: Driver> Drop for UsbTransport<D> {
    fn drop(&mut self) {
        if self.is_connected() {
            if let Err(st) = self.close_handle() {
                warn!("closing USB device on drop: {}", st);
            }
        }
    }
}

impl<D: Driver> fmt::Debug for UsbTransport<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsbTransport")
            .field("connect_mode", &self.connect_mode)
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .field("device_info", &self.device_info)
            .field("trigger_disabler", &self.trigger_disabler.is_some())
            .finish()
    }
}
