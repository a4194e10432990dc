//! FT60x driver status codes and their translation into [`ErrorType`] categories.
//!
//! This is the single place where vendor status codes are interpreted. Two
//! independent static tables are consulted: one yields the diagnostic name of
//! a code, the other its category. Codes missing from the tables map to
//! [`ErrorType::Other`], never to [`ErrorType::Success`].

use std::fmt;

/// Coarse classification shared by all transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    Success,
    /// Device absent, handle invalid or link lost. Requires a reconnect.
    ConnectionError,
    /// No data or space within the allotted wait. Recoverable.
    Timeout,
    Other,
}

/// A raw status code as returned by the FT60x driver (`FT_STATUS`).
///
/// Kept as a newtype rather than an enum so that codes unknown to this crate
/// survive the round trip for diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FtStatus(pub u32);

impl FtStatus {
    pub const OK: Self = Self(0);
    pub const INVALID_HANDLE: Self = Self(1);
    pub const DEVICE_NOT_FOUND: Self = Self(2);
    pub const DEVICE_NOT_OPENED: Self = Self(3);
    pub const IO_ERROR: Self = Self(4);
    pub const INSUFFICIENT_RESOURCES: Self = Self(5);
    pub const INVALID_PARAMETER: Self = Self(6);
    pub const INVALID_BAUD_RATE: Self = Self(7);
    pub const DEVICE_NOT_OPENED_FOR_ERASE: Self = Self(8);
    pub const DEVICE_NOT_OPENED_FOR_WRITE: Self = Self(9);
    pub const FAILED_TO_WRITE_DEVICE: Self = Self(10);
    pub const EEPROM_READ_FAILED: Self = Self(11);
    pub const EEPROM_WRITE_FAILED: Self = Self(12);
    pub const EEPROM_ERASE_FAILED: Self = Self(13);
    pub const EEPROM_NOT_PRESENT: Self = Self(14);
    pub const EEPROM_NOT_PROGRAMMED: Self = Self(15);
    pub const INVALID_ARGS: Self = Self(16);
    pub const NOT_SUPPORTED: Self = Self(17);
    pub const NO_MORE_ITEMS: Self = Self(18);
    pub const TIMEOUT: Self = Self(19);
    pub const OPERATION_ABORTED: Self = Self(20);
    pub const RESERVED_PIPE: Self = Self(21);
    pub const INVALID_CONTROL_REQUEST_DIRECTION: Self = Self(22);
    pub const INVALID_CONTROL_REQUEST_TYPE: Self = Self(23);
    pub const IO_PENDING: Self = Self(24);
    pub const IO_INCOMPLETE: Self = Self(25);
    pub const HANDLE_EOF: Self = Self(26);
    pub const BUSY: Self = Self(27);
    pub const NO_SYSTEM_RESOURCES: Self = Self(28);
    pub const DEVICE_LIST_NOT_READY: Self = Self(29);
    pub const DEVICE_NOT_CONNECTED: Self = Self(30);
    pub const INCORRECT_DEVICE_PATH: Self = Self(31);
    pub const OTHER_ERROR: Self = Self(32);

    /// Returns true for `FT_OK`.
    #[inline]
    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// Diagnostic name of the code, e.g. `"FT_TIMEOUT"`.
    pub fn name(self) -> &'static str {
        STATUS_NAMES
            .get(self.0 as usize)
            .copied()
            .unwrap_or("unknown FT error")
    }

    /// Category of the code.
    pub fn error_type(self) -> ErrorType {
        STATUS_TYPES
            .get(self.0 as usize)
            .copied()
            .unwrap_or(ErrorType::Other)
    }

    /// Converts the code into a `Result`, mapping everything but `FT_OK` to `Err`.
    pub fn into_result(self) -> Result<(), FtStatus> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl fmt::Debug for FtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FtStatus({})", self.name())
    }
}

impl std::error::Error for FtStatus {}

// Indexed by status code.
static STATUS_NAMES: [&str; 33] = [
    "FT_OK",
    "FT_INVALID_HANDLE",
    "FT_DEVICE_NOT_FOUND",
    "FT_DEVICE_NOT_OPENED",
    "FT_IO_ERROR",
    "FT_INSUFFICIENT_RESOURCES",
    "FT_INVALID_PARAMETER",
    "FT_INVALID_BAUD_RATE",
    "FT_DEVICE_NOT_OPENED_FOR_ERASE",
    "FT_DEVICE_NOT_OPENED_FOR_WRITE",
    "FT_FAILED_TO_WRITE_DEVICE",
    "FT_EEPROM_READ_FAILED",
    "FT_EEPROM_WRITE_FAILED",
    "FT_EEPROM_ERASE_FAILED",
    "FT_EEPROM_NOT_PRESENT",
    "FT_EEPROM_NOT_PROGRAMMED",
    "FT_INVALID_ARGS",
    "FT_NOT_SUPPORTED",
    "FT_NO_MORE_ITEMS",
    "FT_TIMEOUT",
    "FT_OPERATION_ABORTED",
    "FT_RESERVED_PIPE",
    "FT_INVALID_CONTROL_REQUEST_DIRECTION",
    "FT_INVALID_CONTROL_REQUEST_TYPE",
    "FT_IO_PENDING",
    "FT_IO_INCOMPLETE",
    "FT_HANDLE_EOF",
    "FT_BUSY",
    "FT_NO_SYSTEM_RESOURCES",
    "FT_DEVICE_LIST_NOT_READY",
    "FT_DEVICE_NOT_CONNECTED",
    "FT_INCORRECT_DEVICE_PATH",
    "FT_OTHER_ERROR",
];

// Indexed by status code. The driver gives no reliable way to tell a
// transient failure from a lost device, so every failure other than a
// timeout is treated as a connection error.
static STATUS_TYPES: [ErrorType; 33] = {
    use crate::status::ErrorType::{ConnectionError as Conn, Success, Timeout};
    [
        Success, // FT_OK
        Conn,    // FT_INVALID_HANDLE
        Conn,    // FT_DEVICE_NOT_FOUND
        Conn,    // FT_DEVICE_NOT_OPENED
        Conn,    // FT_IO_ERROR
        Conn,    // FT_INSUFFICIENT_RESOURCES
        Conn,    // FT_INVALID_PARAMETER
        Conn,    // FT_INVALID_BAUD_RATE
        Conn,    // FT_DEVICE_NOT_OPENED_FOR_ERASE
        Conn,    // FT_DEVICE_NOT_OPENED_FOR_WRITE
        Conn,    // FT_FAILED_TO_WRITE_DEVICE
        Conn,    // FT_EEPROM_READ_FAILED
        Conn,    // FT_EEPROM_WRITE_FAILED
        Conn,    // FT_EEPROM_ERASE_FAILED
        Conn,    // FT_EEPROM_NOT_PRESENT
        Conn,    // FT_EEPROM_NOT_PROGRAMMED
        Conn,    // FT_INVALID_ARGS
        Conn,    // FT_NOT_SUPPORTED
        Conn,    // FT_NO_MORE_ITEMS
        Timeout, // FT_TIMEOUT
        Conn,    // FT_OPERATION_ABORTED
        Conn,    // FT_RESERVED_PIPE
        Conn,    // FT_INVALID_CONTROL_REQUEST_DIRECTION
        Conn,    // FT_INVALID_CONTROL_REQUEST_TYPE
        Conn,    // FT_IO_PENDING
        Conn,    // FT_IO_INCOMPLETE
        Conn,    // FT_HANDLE_EOF
        Conn,    // FT_BUSY
        Conn,    // FT_NO_SYSTEM_RESOURCES
        Conn,    // FT_DEVICE_LIST_NOT_READY
        Conn,    // FT_DEVICE_NOT_CONNECTED
        Conn,    // FT_INCORRECT_DEVICE_PATH
        Conn,    // FT_OTHER_ERROR
    ]
};
