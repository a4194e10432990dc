//! Scripted FT60x driver for running the transport without hardware.
//!
//! All handles created by a [`MockDriver`] share one [`MockState`]. Tests
//! script device lists, read results and write failures in the state and
//! inspect the recorded calls afterwards.

#![allow(dead_code)]

use mvlc_usb::{
    ChipConfiguration, ConnectMode, DeviceFlags, DeviceInfo, Driver, EndpointDirection, FtStatus,
    NativeHandle, NativeTransfer, Pipe, PipeMode, TransportConfig, UsbTransport, Version,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// One scripted native read result.
#[derive(Debug, Clone)]
pub enum ReadStep {
    /// Success with these bytes. Bytes that do not fit the caller's buffer
    /// stay queued for the next read.
    Data(Vec<u8>),
    /// Failure after delivering these bytes.
    Fail(Vec<u8>, FtStatus),
}

pub struct MockState {
    pub devices: Vec<DeviceInfo>,
    pub list_status: Option<FtStatus>,
    /// Number of `create()` calls that fail before one succeeds.
    pub create_failures: usize,
    pub create_calls: usize,
    pub chip_config: ChipConfiguration,
    pub chip_config_status: Option<FtStatus>,

    /// Scripted reads per pipe; an empty queue times out with zero bytes.
    pub reads: [VecDeque<ReadStep>; 2],
    /// Sleep before an empty-queue timeout, standing in for the driver's
    /// read timeout.
    pub timeout_delay: Duration,
    /// Scripted write results; an empty queue writes everything.
    pub write_results: VecDeque<NativeTransfer>,

    /// Models a controller still in acquisition mode: while set, every data
    /// read returns a chunk of this size until `disable_command` is written
    /// to the command pipe.
    pub stream_chunk: Option<usize>,
    pub stream_delay: Duration,
    pub disable_command: Vec<u8>,
    pub triggers_disabled: bool,

    pub native_calls: usize,
    pub writes: Vec<(Pipe, Vec<u8>)>,
    pub read_requests: Vec<(Pipe, usize)>,
    pub aborts: Vec<(Pipe, EndpointDirection)>,
    pub timeouts: Vec<(Pipe, EndpointDirection, Duration)>,
    pub stream_pipe: Option<usize>,
    pub open_handles: usize,
    pub closed_handles: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            list_status: None,
            create_failures: 0,
            create_calls: 0,
            chip_config: ChipConfiguration::mvlc_default(),
            chip_config_status: None,
            reads: [VecDeque::new(), VecDeque::new()],
            timeout_delay: Duration::ZERO,
            write_results: VecDeque::new(),
            stream_chunk: None,
            stream_delay: Duration::ZERO,
            disable_command: Vec::new(),
            triggers_disabled: false,
            native_calls: 0,
            writes: Vec::new(),
            read_requests: Vec::new(),
            aborts: Vec::new(),
            timeouts: Vec::new(),
            stream_pipe: None,
            open_handles: 0,
            closed_handles: 0,
        }
    }
}

#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// A driver reporting one MVLC with serial `"02220042"` at index 0.
    pub fn with_mvlc() -> Self {
        let driver = Self::default();
        driver.state().devices.push(mvlc_device(0, "02220042"));
        driver
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    pub fn queue_read(&self, pipe: Pipe, step: ReadStep) {
        self.state().reads[pipe.index()].push_back(step);
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn mvlc_device(index: u32, serial: &str) -> DeviceInfo {
    DeviceInfo {
        index,
        serial: serial.to_string(),
        description: "MVLC".to_string(),
        flags: DeviceFlags::USB3,
        native_id: u64::from(index),
    }
}

pub fn other_device(index: u32, serial: &str, description: &str) -> DeviceInfo {
    DeviceInfo {
        index,
        serial: serial.to_string(),
        description: description.to_string(),
        flags: DeviceFlags::USB2,
        native_id: u64::from(index),
    }
}

pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut s = self.state();
        s.open_handles -= 1;
        s.closed_handles += 1;
    }
}

impl Driver for MockDriver {
    type Handle = MockHandle;

    fn device_list(&self) -> Result<Vec<DeviceInfo>, FtStatus> {
        let s = self.state();
        match s.list_status {
            Some(st) => Err(st),
            None => Ok(s.devices.clone()),
        }
    }

    fn create(&self, index: u32) -> Result<MockHandle, FtStatus> {
        let mut s = self.state();
        s.create_calls += 1;
        if s.create_failures > 0 {
            s.create_failures -= 1;
            return Err(FtStatus::DEVICE_NOT_OPENED);
        }
        if !s.devices.iter().any(|d| d.index == index) {
            return Err(FtStatus::DEVICE_NOT_FOUND);
        }
        s.open_handles += 1;
        Ok(MockHandle {
            state: Arc::clone(&self.state),
        })
    }

    fn library_version(&self) -> Version {
        Version::from_packed(0x0102_0019)
    }
}

fn copy_into(buf: &mut [u8], bytes: &[u8]) -> usize {
    let n = bytes.len().min(buf.len());
    buf[..n].copy_from_slice(&bytes[..n]);
    n
}

impl NativeHandle for MockHandle {
    fn chip_configuration(&self) -> Result<ChipConfiguration, FtStatus> {
        let s = self.state();
        match s.chip_config_status {
            Some(st) => Err(st),
            None => Ok(s.chip_config.clone()),
        }
    }

    fn set_pipe_timeout(
        &self,
        pipe: Pipe,
        dir: EndpointDirection,
        timeout: Duration,
    ) -> Result<(), FtStatus> {
        self.state().timeouts.push((pipe, dir, timeout));
        Ok(())
    }

    fn set_stream_pipe(&self, stream_size: usize) -> Result<(), FtStatus> {
        self.state().stream_pipe = Some(stream_size);
        Ok(())
    }

    fn write_pipe(&self, pipe: Pipe, data: &[u8]) -> NativeTransfer {
        let mut s = self.state();
        s.native_calls += 1;
        if pipe == Pipe::Command && !s.disable_command.is_empty() && data == s.disable_command {
            s.triggers_disabled = true;
        }
        let result = s
            .write_results
            .pop_front()
            .unwrap_or(NativeTransfer::ok(data.len()));
        let written = result.transferred.min(data.len());
        s.writes.push((pipe, data[..written].to_vec()));
        result
    }

    fn read_pipe(&self, pipe: Pipe, buf: &mut [u8]) -> NativeTransfer {
        let delay = {
            let mut s = self.state();
            s.native_calls += 1;
            s.read_requests.push((pipe, buf.len()));

            match (pipe, s.stream_chunk) {
                (Pipe::Data, Some(chunk)) if !s.triggers_disabled => {
                    let n = chunk.min(buf.len());
                    buf[..n].fill(0xAA);
                    let delay = s.stream_delay;
                    drop(s);
                    thread::sleep(delay);
                    return NativeTransfer::ok(n);
                }
                _ => {}
            }

            match s.reads[pipe.index()].pop_front() {
                Some(ReadStep::Data(bytes)) => {
                    let n = copy_into(buf, &bytes);
                    if n < bytes.len() {
                        s.reads[pipe.index()].push_front(ReadStep::Data(bytes[n..].to_vec()));
                    }
                    return NativeTransfer::ok(n);
                }
                Some(ReadStep::Fail(bytes, st)) => {
                    return NativeTransfer::failed(copy_into(buf, &bytes), st);
                }
                None => s.timeout_delay,
            }
        };

        thread::sleep(delay);
        NativeTransfer::failed(0, FtStatus::TIMEOUT)
    }

    fn abort_pipe(&self, pipe: Pipe, dir: EndpointDirection) -> Result<(), FtStatus> {
        self.state().aborts.push((pipe, dir));
        Ok(())
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Opens a transport on a single-MVLC mock without the startup handshake.
pub fn connected(pipe_mode: PipeMode) -> (MockDriver, UsbTransport<MockDriver>) {
    init_logger();
    let driver = MockDriver::with_mvlc();
    let config = TransportConfig::default()
        .with_pipe_mode(pipe_mode)
        .with_disable_triggers_on_connect(false);
    let mut transport = UsbTransport::with_config(driver.clone(), ConnectMode::First, config);
    transport.open().expect("open on mock driver");
    driver.state().native_calls = 0;
    driver.state().aborts.clear();
    (driver, transport)
}

/// `len` bytes counting up from `start`.
pub fn pattern(start: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| start.wrapping_add(i as u8)).collect()
}
