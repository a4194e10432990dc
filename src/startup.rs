//! Post-connect handshake: disable triggers while draining the data pipe.
//!
//! A controller that was left running by a previous session keeps streaming
//! readout data. The command to stop it can only be issued once the data pipe
//! is being read, otherwise the device stalls on its full FIFO and never
//! answers. The handshake therefore runs two actors concurrently:
//!
//! - the *disabler* sends the trigger-disable command over the command pipe,
//!   retrying on non-fatal errors,
//! - the *drainer* reads and discards the data pipe until it runs dry, the
//!   drain budget is spent or the connection fails.
//!
//! The disabler is given a [`CommandPipe`], which cannot reach the data pipe.

use crate::consts::{DISABLE_TRIGGER_RETRY_COUNT, USB_STREAM_PIPE_READ_SIZE};
use crate::driver::Driver;
use crate::error::{Error, Result, TransferResult};
use crate::pipe::Pipe;
use crate::transport::UsbTransport;
use log::{debug, info, trace, warn};
use std::thread;
use std::time::{Duration, Instant};

/// Issues the controller's "disable all triggers and DAQ mode" command.
///
/// Implemented for any `Fn(&CommandPipe) -> Result<()>`, so a closure is
/// usually all that is needed. Errors whose category is
/// [`ErrorType::ConnectionError`](crate::ErrorType::ConnectionError) end the
/// handshake; any other error is retried.
pub trait TriggerDisabler: Send + Sync {
    fn disable_triggers(&self, pipe: &CommandPipe<'_>) -> Result<()>;
}

impl<F> TriggerDisabler for F
where
    F: Fn(&CommandPipe<'_>) -> Result<()> + Send + Sync,
{
    fn disable_triggers(&self, pipe: &CommandPipe<'_>) -> Result<()> {
        self(pipe)
    }
}

// Command pipe access of a transport, erased over the driver type.
pub(crate) trait CommandIo: Sync {
    fn write_command(&self, data: &[u8]) -> TransferResult;
    fn read_command(&self, dest: &mut [u8]) -> TransferResult;
    fn read_command_unbuffered(&self, dest: &mut [u8]) -> TransferResult;
}

impl<D: Driver> CommandIo for UsbTransport<D> {
    fn write_command(&self, data: &[u8]) -> TransferResult {
        self.write(Pipe::Command, data)
    }

    fn read_command(&self, dest: &mut [u8]) -> TransferResult {
        self.read(Pipe::Command, dest)
    }

    fn read_command_unbuffered(&self, dest: &mut [u8]) -> TransferResult {
        self.read_unbuffered(Pipe::Command, dest)
    }
}

/// Command pipe of a transport that is still connecting.
///
/// Same semantics as [`UsbTransport::write`], [`UsbTransport::read`] and
/// [`UsbTransport::read_unbuffered`] on [`Pipe::Command`].
pub struct CommandPipe<'a> {
    io: &'a dyn CommandIo,
}

impl<'a> CommandPipe<'a> {
    pub(crate) fn new(io: &'a dyn CommandIo) -> Self {
        Self { io }
    }

    pub fn write(&self, data: &[u8]) -> TransferResult {
        self.io.write_command(data)
    }

    pub fn read(&self, dest: &mut [u8]) -> TransferResult {
        self.io.read_command(dest)
    }

    pub fn read_unbuffered(&self, dest: &mut [u8]) -> TransferResult {
        self.io.read_command_unbuffered(dest)
    }
}

#[derive(Debug, Default)]
struct DrainSummary {
    total_bytes: usize,
    connection_error: Option<Error>,
}

/// Runs the handshake. Fails only with a connection error from either actor.
pub(crate) fn post_connect_cleanup<D: Driver>(
    transport: &UsbTransport<D>,
    disabler: &dyn TriggerDisabler,
    drain_budget: Duration,
) -> Result<()> {
    debug!("begin post connect cleanup");
    let start = Instant::now();

    let (disable_result, drained) = thread::scope(|s| {
        let disable_actor = s.spawn(|| {
            let pipe = CommandPipe::new(transport);
            disable_triggers_with_retry(&pipe, disabler)
        });

        let drained = drain_data_pipe(transport, drain_budget);

        match disable_actor.join() {
            Ok(result) => (result, drained),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    });

    info!(
        "end post connect cleanup: drained {} bytes from the data pipe in {:?}",
        drained.total_bytes,
        start.elapsed()
    );

    disable_result?;
    match drained.connection_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn disable_triggers_with_retry(pipe: &CommandPipe<'_>, disabler: &dyn TriggerDisabler) -> Result<()> {
    for attempt in 1..=DISABLE_TRIGGER_RETRY_COUNT {
        match disabler.disable_triggers(pipe) {
            Ok(()) => {
                debug!("disabled triggers (attempt {})", attempt);
                return Ok(());
            }
            Err(e) if e.is_connection_error() => {
                warn!("disabling triggers failed with connection error: {}", e);
                return Err(e);
            }
            Err(e) => debug!(
                "disabling triggers, attempt {}/{} failed: {}",
                attempt, DISABLE_TRIGGER_RETRY_COUNT, e
            ),
        }
    }

    warn!(
        "could not disable triggers after {} attempts",
        DISABLE_TRIGGER_RETRY_COUNT
    );
    Ok(())
}

fn drain_data_pipe<D: Driver>(transport: &UsbTransport<D>, budget: Duration) -> DrainSummary {
    let mut buffer = vec![0u8; USB_STREAM_PIPE_READ_SIZE];
    let mut summary = DrainSummary::default();
    let start = Instant::now();

    loop {
        let transferred = match transport.read_unbuffered(Pipe::Data, &mut buffer) {
            Ok(n) => n,
            Err(e) if e.is_connection_error() => {
                summary.total_bytes += e.transferred;
                warn!("draining data pipe failed: {}", e);
                summary.connection_error = Some(e.error);
                return summary;
            }
            Err(e) => {
                trace!("draining data pipe: {}", e);
                e.transferred
            }
        };

        summary.total_bytes += transferred;

        if transferred == 0 {
            break;
        }
        if start.elapsed() >= budget {
            debug!("data pipe drain budget of {:?} elapsed", budget);
            break;
        }
    }

    summary
}
