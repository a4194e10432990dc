use crate::status::{ErrorType, FtStatus};
use thiserror::Error;

/// Errors that can occur when using the MVLC USB transport.
///
/// Every variant can be reduced to one of the four [`ErrorType`] categories
/// via [`Error::error_type`], which is what transport-agnostic callers should
/// branch on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Non-success status returned by the FT60x driver.
    #[error("USB driver error: {0}")]
    Status(#[from] FtStatus),
    /// No MVLC was found when connecting to the first available device.
    #[error("No MVLC USB device found")]
    DeviceNotFound,
    /// No device was found at the requested enumeration index.
    #[error("No USB device found at index {index}")]
    DeviceNotFoundByIndex {
        /// The index that was requested.
        index: u32,
    },
    /// No device was found with the requested serial number.
    #[error("No USB device found with serial number '{serial}'")]
    DeviceNotFoundBySerial {
        /// The serial number that was searched for.
        serial: String,
    },
    /// `open()` was called on a transport that is already connected.
    #[error("Transport is already connected")]
    IsConnected,
    /// `close()` was called on a transport that is not connected.
    #[error("Transport is not connected")]
    IsDisconnected,
    /// A raw pipe number outside of the known pipes.
    #[error("Invalid pipe number {0}")]
    InvalidPipe(u8),
    /// The FT60x chip configuration does not match the MVLC profile.
    #[error("FT60x chip configuration mismatch: {0}")]
    ChipConfigError(String),
    /// Requested transfer exceeds the single-transfer maximum.
    #[error("Requested transfer size is too large (max {max}, got {actual})")]
    OperationTooLarge {
        /// Maximum allowed size for a single transfer.
        max: usize,
        /// Actual size requested.
        actual: usize,
    },
}

impl Error {
    /// Category of this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            Error::Status(st) => st.error_type(),
            Error::DeviceNotFound
            | Error::DeviceNotFoundByIndex { .. }
            | Error::DeviceNotFoundBySerial { .. }
            | Error::ChipConfigError(_) => ErrorType::ConnectionError,
            Error::IsConnected
            | Error::IsDisconnected
            | Error::InvalidPipe(_)
            | Error::OperationTooLarge { .. } => ErrorType::Other,
        }
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        self.error_type() == ErrorType::Timeout
    }

    #[inline]
    pub fn is_connection_error(&self) -> bool {
        self.error_type() == ErrorType::ConnectionError
    }

    /// The originating driver status, if this error came from the driver.
    pub fn status(&self) -> Option<FtStatus> {
        match self {
            Error::Status(st) => Some(*st),
            _ => None,
        }
    }
}

/// A failed pipe transfer together with the number of bytes that were moved
/// before the failure.
///
/// Reads in particular may deliver part of the requested data and then time
/// out; those bytes are valid and already consumed from the device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error} ({transferred} bytes transferred)")]
pub struct TransferError {
    pub transferred: usize,
    #[source]
    pub error: Error,
}

impl TransferError {
    pub fn new(transferred: usize, error: impl Into<Error>) -> Self {
        Self {
            transferred,
            error: error.into(),
        }
    }

    #[inline]
    pub fn error_type(&self) -> ErrorType {
        self.error.error_type()
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        self.error.is_timeout()
    }

    #[inline]
    pub fn is_connection_error(&self) -> bool {
        self.error.is_connection_error()
    }
}

impl From<Error> for TransferError {
    fn from(error: Error) -> Self {
        Self::new(0, error)
    }
}

/// Drops the partial byte count.
impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        e.error
    }
}

impl From<FtStatus> for TransferError {
    fn from(st: FtStatus) -> Self {
        Self::new(0, st)
    }
}

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result of a single pipe transfer: the number of bytes moved.
pub type TransferResult = std::result::Result<usize, TransferError>;
