//! Internal constants: USB identifiers, endpoints, timeouts and chip configuration values.

use std::time::Duration;

// Default Vendor/Product IDs
/// FTDI vendor ID used by the FT60x bridge inside the MVLC.
pub const FTDI_VID: u16 = 0x0403;
/// Product ID of the FT600 (16-bit FIFO bus).
pub const FT600_PID: u16 = 0x601E;
/// Product ID of the FT601 (32-bit FIFO bus, used by the MVLC).
pub const FT601_PID: u16 = 0x601F;

/// Substring of the USB product description identifying MVLC controllers.
pub const MVLC_DESCRIPTION_MARKER: &str = "MVLC";

// --- Transfer limits ---
/// Largest byte count movable in one native read or write call.
pub const USB_SINGLE_TRANSFER_MAX_BYTES: usize = 1024 * 1024;
/// Size of the native reads used to refill the retained read buffers and
/// of the stream pipe setup.
pub const USB_STREAM_PIPE_READ_SIZE: usize = 1024 * 1024;

// --- Timeouts ---
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(2000);
pub const READ_TIMEOUT: Duration = Duration::from_millis(2000);

// --- Connect / startup ---
/// Native open is retried because the first FT_Create on USB2 links
/// sometimes fails spuriously.
pub const MAX_OPEN_ATTEMPTS: usize = 3;
pub const DISABLE_TRIGGER_RETRY_COUNT: usize = 5;
pub const DEFAULT_DRAIN_BUDGET: Duration = Duration::from_secs(10);

// --- Endpoints ---
pub mod endpoint {
    /// Set on the endpoint address for device-to-host (IN) endpoints.
    pub const DIR_IN: u8 = 0x80;
    pub const COMMAND: u8 = 0x02;
    pub const DATA: u8 = 0x03;
    /// Session endpoint used by the FT60x to receive read requests.
    pub const SESSION_OUT: u8 = 0x01;
}

// --- FT60x chip configuration (FT_60XCONFIGURATION) ---
pub mod chip {
    /// Size of the configuration block returned by the chip.
    pub const CONFIGURATION_SIZE: usize = 152;

    /// Expected profile: 100 MHz FIFO clock, 600 mode, two channels.
    pub const FIFO_CLK_100: u8 = 0;
    pub const FIFO_MODE_600: u8 = 1;
    pub const CHANNEL_CONFIG_2: u8 = 1;

    pub const POWER_SELF_POWERED: u8 = 0x40;
    pub const POWER_REMOTE_WAKEUP: u8 = 0x20;

    pub const OPTIONAL_FEATURE_DISABLE_ALL: u16 = 0;

    // Vendor control request reading the configuration block.
    pub const REQUEST_TYPE_VENDOR_IN: u8 = 0xC0;
    pub const REQUEST_GET_CONFIGURATION: u8 = 0xCF;
    pub const VALUE_GET_CONFIGURATION: u16 = 0x0001;
}

// --- FT60x session requests (sent on endpoint::SESSION_OUT) ---
pub mod session {
    pub const REQUEST_SIZE: usize = 20;
    pub const CMD_READ: u8 = 0x01;
    pub const CMD_STREAM: u8 = 0x02;
    pub const CMD_ABORT: u8 = 0x03;
    /// Interfaces claimed on open: 0 carries the session/notification
    /// endpoints, 1 the FIFO data endpoints.
    pub const INTERFACES: [u8; 2] = [0, 1];
}
