//! The two logical channels of the link and their endpoint mapping.

use crate::consts::endpoint;
use crate::error::Error;
use std::fmt;

/// Number of pipes; also the size of per-pipe tables.
pub const PIPE_COUNT: usize = 2;

/// One of the two independent logical channels over the USB link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipe {
    /// Low-volume command/response channel.
    Command,
    /// High-volume streaming readout data.
    Data,
}

/// Transfer direction relative to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointDirection {
    /// Device to host.
    In,
    /// Host to device.
    Out,
}

impl Pipe {
    pub const ALL: [Pipe; PIPE_COUNT] = [Pipe::Command, Pipe::Data];

    /// Index of the pipe into per-pipe tables.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Pipe::Command => 0,
            Pipe::Data => 1,
        }
    }

    /// FIFO channel of the FT60x carrying this pipe.
    #[inline]
    pub fn fifo_id(self) -> u8 {
        match self {
            Pipe::Command => 0,
            Pipe::Data => 1,
        }
    }

    /// USB endpoint address for the given direction.
    pub fn endpoint(self, dir: EndpointDirection) -> u8 {
        let ep = match self {
            Pipe::Command => endpoint::COMMAND,
            Pipe::Data => endpoint::DATA,
        };
        match dir {
            EndpointDirection::In => ep | endpoint::DIR_IN,
            EndpointDirection::Out => ep,
        }
    }
}

impl TryFrom<u8> for Pipe {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Pipe::Command),
            1 => Ok(Pipe::Data),
            n => Err(Error::InvalidPipe(n)),
        }
    }
}

impl fmt::Display for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipe::Command => f.write_str("command"),
            Pipe::Data => f.write_str("data"),
        }
    }
}

impl fmt::Display for EndpointDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointDirection::In => f.write_str("in"),
            EndpointDirection::Out => f.write_str("out"),
        }
    }
}

/// How the host driver treats bytes of a native read that the caller did not
/// ask for. Selects the read strategy of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeMode {
    /// The driver discards unread bytes between calls (Windows D3XX). Reads
    /// are served from a retained per-pipe buffer refilled with full-size
    /// native reads, failed transfers abort the endpoint and read pipes run
    /// in streaming mode.
    Buffered,
    /// The driver keeps unread bytes for the next call (Linux/libusb). Reads
    /// go straight to the driver and pipe aborts are no-ops.
    PassThrough,
}

impl PipeMode {
    /// The mode matching the host platform's driver semantics.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            PipeMode::Buffered
        } else {
            PipeMode::PassThrough
        }
    }
}

impl Default for PipeMode {
    fn default() -> Self {
        Self::platform_default()
    }
}
