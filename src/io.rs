//! Pipe I/O: writes, buffered and pass-through reads, endpoint aborts.

use crate::consts::USB_SINGLE_TRANSFER_MAX_BYTES;
use crate::driver::{Driver, NativeHandle};
use crate::error::{Error, Result, TransferError, TransferResult};
use crate::pipe::{EndpointDirection, Pipe, PipeMode};
use crate::status::{ErrorType, FtStatus};
use crate::transport::UsbTransport;
use log::{debug, trace, warn};

fn check_size(len: usize) -> std::result::Result<(), TransferError> {
    if len > USB_SINGLE_TRANSFER_MAX_BYTES {
        return Err(Error::OperationTooLarge {
            max: USB_SINGLE_TRANSFER_MAX_BYTES,
            actual: len,
        }
        .into());
    }
    Ok(())
}

impl<D: Driver> UsbTransport<D> {
    /// Writes `data` to the pipe's OUT endpoint.
    ///
    /// Returns the number of bytes written. On failure the error carries the
    /// partial count and, in buffered mode, the OUT endpoint is aborted.
    pub fn write(&self, pipe: Pipe, data: &[u8]) -> TransferResult {
        check_size(data.len())?;
        let handle = self.native()?;

        let native = handle.write_pipe(pipe, data);
        trace!(
            "write: pipe={}, size={}, written={}, status={}",
            pipe,
            data.len(),
            native.transferred,
            native.status
        );

        if native.status.is_ok() {
            return Ok(native.transferred);
        }

        warn!(
            "write: pipe={}, wrote {} of {} bytes, result={}",
            pipe,
            native.transferred,
            data.len(),
            native.status
        );
        self.abort_after_failure(pipe, EndpointDirection::Out);
        Err(TransferError::new(native.transferred, native.status))
    }

    /// Reads exactly `dest.len()` bytes from the pipe, or fails with the
    /// partial count.
    ///
    /// In [`PipeMode::Buffered`] surplus bytes of a native read are retained
    /// and handed out by later calls on the same pipe. A read that cannot be
    /// satisfied ends with a timeout error carrying the bytes delivered so
    /// far. In [`PipeMode::PassThrough`] the call maps to one native read and
    /// may return fewer bytes than requested.
    pub fn read(&self, pipe: Pipe, dest: &mut [u8]) -> TransferResult {
        check_size(dest.len())?;
        let handle = self.native()?;

        match self.config().pipe_mode {
            PipeMode::Buffered => self.read_buffered(handle, pipe, dest),
            PipeMode::PassThrough => {
                let native = handle.read_pipe(pipe, dest);
                trace!(
                    "read: pipe={}, requested={}, received={}, status={}",
                    pipe,
                    dest.len(),
                    native.transferred,
                    native.status
                );
                if native.status.is_ok() {
                    return Ok(native.transferred);
                }
                if native.status.error_type() != ErrorType::Timeout {
                    warn!(
                        "read: pipe={}, received {} bytes, result={}",
                        pipe, native.transferred, native.status
                    );
                }
                Err(TransferError::new(native.transferred, native.status))
            }
        }
    }

    fn read_buffered(&self, handle: &D::Handle, pipe: Pipe, dest: &mut [u8]) -> TransferResult {
        let requested = dest.len();
        let mut buffer = self.read_buffer(pipe);

        let mut copied = buffer.take(dest);
        if copied == requested {
            trace!(
                "read: pipe={}, requested={} served from buffer, {} left",
                pipe,
                requested,
                buffer.len()
            );
            return Ok(copied);
        }

        let status = buffer.refill_with(|area| {
            let native = handle.read_pipe(pipe, area);
            (native.transferred, native.status)
        });
        trace!(
            "read: pipe={}, native read of {} bytes: received={}, status={}",
            pipe,
            buffer.capacity(),
            buffer.len(),
            status
        );

        if !status.is_ok() {
            self.abort_after_failure(pipe, EndpointDirection::In);
        }

        copied += buffer.take(&mut dest[copied..]);

        if !status.is_ok() && status.error_type() != ErrorType::Timeout {
            warn!(
                "read: pipe={}, delivered {} of {} bytes, result={}",
                pipe, copied, requested, status
            );
            return Err(TransferError::new(copied, status));
        }

        if copied < requested {
            debug!(
                "read: pipe={}, delivered {} of {} bytes, returning timeout",
                pipe, copied, requested
            );
            return Err(TransferError::new(copied, FtStatus::TIMEOUT));
        }

        Ok(copied)
    }

    /// One native read straight into `dest`, bypassing the retained buffer.
    ///
    /// Returns whatever the driver delivered; zero bytes with a timeout is a
    /// normal outcome when the device has nothing to send.
    pub fn read_unbuffered(&self, pipe: Pipe, dest: &mut [u8]) -> TransferResult {
        check_size(dest.len())?;
        let handle = self.native()?;

        let native = handle.read_pipe(pipe, dest);
        trace!(
            "read_unbuffered: pipe={}, requested={}, received={}, status={}",
            pipe,
            dest.len(),
            native.transferred,
            native.status
        );

        if native.status.is_ok() {
            return Ok(native.transferred);
        }

        self.abort_after_failure(pipe, EndpointDirection::In);
        Err(TransferError::new(native.transferred, native.status))
    }

    /// Aborts pending transfers on one endpoint and clears its stall.
    ///
    /// A no-op in [`PipeMode::PassThrough`], where the driver recovers
    /// endpoints itself.
    pub fn abort(&self, pipe: Pipe, dir: EndpointDirection) -> Result<()> {
        if self.config().pipe_mode == PipeMode::PassThrough {
            return Ok(());
        }
        let handle = self.native()?;
        trace!("abort: pipe={}, dir={}", pipe, dir);
        handle.abort_pipe(pipe, dir)?;
        Ok(())
    }

    fn abort_after_failure(&self, pipe: Pipe, dir: EndpointDirection) {
        if let Err(e) = self.abort(pipe, dir) {
            warn!("abort: pipe={}, dir={}, result={}", pipe, dir, e);
        }
    }
}
