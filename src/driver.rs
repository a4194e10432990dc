//! Boundary to the native FT60x driver.
//!
//! The transport never talks to USB directly. Everything below [`Driver`] and
//! [`NativeHandle`] is opaque and reports failures as raw [`FtStatus`] codes,
//! which the transport translates through the status tables. The default
//! implementation is [`crate::Ft60xDriver`] (libusb via `rusb`); tests plug in
//! scripted drivers.

use crate::consts::chip;
use crate::device::DeviceInfo;
use crate::error::{Error, Result};
use crate::pipe::{EndpointDirection, Pipe};
use crate::status::FtStatus;
use std::fmt;
use std::time::Duration;

/// Outcome of one native transfer: bytes moved plus the driver status.
///
/// The driver may report a failure after moving some bytes, so both values
/// are always meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTransfer {
    pub transferred: usize,
    pub status: FtStatus,
}

impl NativeTransfer {
    pub fn ok(transferred: usize) -> Self {
        Self {
            transferred,
            status: FtStatus::OK,
        }
    }

    pub fn failed(transferred: usize, status: FtStatus) -> Self {
        Self {
            transferred,
            status,
        }
    }
}

/// Entry point of a native driver: enumeration and handle creation.
pub trait Driver: Send + Sync {
    type Handle: NativeHandle;

    /// Unfiltered list of all FT60x devices visible to the driver, in driver
    /// index order.
    fn device_list(&self) -> std::result::Result<Vec<DeviceInfo>, FtStatus>;

    /// Opens the device at the given driver index.
    fn create(&self, index: u32) -> std::result::Result<Self::Handle, FtStatus>;

    /// Version of the underlying driver library.
    fn library_version(&self) -> Version;
}

/// An open connection to one device.
///
/// Implementations must tolerate concurrent calls on *different* pipes from
/// two threads; calls on the same pipe are serialized by the transport's
/// callers.
pub trait NativeHandle: Send + Sync {
    /// Reads the chip configuration block.
    fn chip_configuration(&self) -> std::result::Result<ChipConfiguration, FtStatus>;

    /// Sets the timeout of one endpoint. A zero timeout makes reads return
    /// immediately with whatever the driver has buffered.
    fn set_pipe_timeout(
        &self,
        pipe: Pipe,
        dir: EndpointDirection,
        timeout: Duration,
    ) -> std::result::Result<(), FtStatus>;

    /// Switches all read pipes into streaming mode with fixed-size transfers.
    fn set_stream_pipe(&self, stream_size: usize) -> std::result::Result<(), FtStatus>;

    fn write_pipe(&self, pipe: Pipe, data: &[u8]) -> NativeTransfer;

    fn read_pipe(&self, pipe: Pipe, buf: &mut [u8]) -> NativeTransfer;

    /// Aborts pending transfers and clears a stall on one endpoint.
    fn abort_pipe(&self, pipe: Pipe, dir: EndpointDirection) -> std::result::Result<(), FtStatus>;

    /// Closes the handle, reporting the driver status of the close.
    fn close(self) -> std::result::Result<(), FtStatus>
    where
        Self: Sized,
    {
        drop(self);
        Ok(())
    }
}

/// Driver or library version, packed as `major.minor.build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub build: u16,
}

impl Version {
    /// Unpacks the D3XX `0xMMmmbbbb` layout.
    pub fn from_packed(value: u32) -> Self {
        Self {
            major: (value >> 24) as u8,
            minor: (value >> 16) as u8,
            build: value as u16,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// The FT60x configuration block (`FT_60XCONFIGURATION`).
///
/// Only the fields relevant to the MVLC are decoded; the string descriptors
/// and GPIO settings are kept raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipConfiguration {
    pub vendor_id: u16,
    pub product_id: u16,
    pub string_descriptors: Vec<u8>,
    pub power_attributes: u8,
    pub power_consumption: u16,
    pub fifo_clock: u8,
    pub fifo_mode: u8,
    pub channel_config: u8,
    pub optional_feature_support: u16,
    pub battery_charging_gpio_config: u8,
    pub flash_eeprom_detection: u8,
    pub msio_control: u32,
    pub gpio_control: u32,
}

impl ChipConfiguration {
    /// A configuration matching the MVLC profile, as accepted by
    /// [`check_chip_configuration`].
    pub fn mvlc_default() -> Self {
        Self {
            vendor_id: crate::consts::FTDI_VID,
            product_id: crate::consts::FT601_PID,
            string_descriptors: vec![0; 128],
            power_attributes: chip::POWER_SELF_POWERED | chip::POWER_REMOTE_WAKEUP,
            power_consumption: 0,
            fifo_clock: chip::FIFO_CLK_100,
            fifo_mode: chip::FIFO_MODE_600,
            channel_config: chip::CHANNEL_CONFIG_2,
            optional_feature_support: chip::OPTIONAL_FEATURE_DISABLE_ALL,
            battery_charging_gpio_config: 0,
            flash_eeprom_detection: 0,
            msio_control: 0,
            gpio_control: 0,
        }
    }

    /// Decodes the little-endian 152-byte block read from the chip.
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        if raw.len() < chip::CONFIGURATION_SIZE {
            return None;
        }
        let u16_at = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]);

        // Layout: VID(2) PID(2) strings(128) reserved(1) power_attr(1)
        // power_consumption(2) reserved(1) fifo_clock(1) fifo_mode(1)
        // channel_config(1) optional_features(2) bc_gpio(1) flash(1)
        // msio(4) gpio(4)
        Some(Self {
            vendor_id: u16_at(0),
            product_id: u16_at(2),
            string_descriptors: raw[4..132].to_vec(),
            power_attributes: raw[133],
            power_consumption: u16_at(134),
            fifo_clock: raw[137],
            fifo_mode: raw[138],
            channel_config: raw[139],
            optional_feature_support: u16_at(140),
            battery_charging_gpio_config: raw[142],
            flash_eeprom_detection: raw[143],
            msio_control: u32_at(144),
            gpio_control: u32_at(148),
        })
    }
}

/// Verifies that the chip runs the configuration the MVLC firmware expects:
/// 100 MHz FIFO clock, 600 mode, two channels, self powered with remote
/// wakeup, no optional features.
pub fn check_chip_configuration(conf: &ChipConfiguration) -> Result<()> {
    let mismatch = if conf.fifo_clock != chip::FIFO_CLK_100 {
        Some(format!("fifo_clock={}", conf.fifo_clock))
    } else if conf.fifo_mode != chip::FIFO_MODE_600 {
        Some(format!("fifo_mode={}", conf.fifo_mode))
    } else if conf.channel_config != chip::CHANNEL_CONFIG_2 {
        Some(format!("channel_config={}", conf.channel_config))
    } else if conf.power_attributes & chip::POWER_SELF_POWERED == 0 {
        Some(format!("power_attributes=0x{:02X} (not self powered)", conf.power_attributes))
    } else if conf.power_attributes & chip::POWER_REMOTE_WAKEUP == 0 {
        Some(format!("power_attributes=0x{:02X} (no remote wakeup)", conf.power_attributes))
    } else if conf.optional_feature_support != chip::OPTIONAL_FEATURE_DISABLE_ALL {
        Some(format!(
            "optional_feature_support=0x{:04X}",
            conf.optional_feature_support
        ))
    } else {
        None
    };

    match mismatch {
        Some(detail) => Err(Error::ChipConfigError(detail)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_passes() {
        assert!(check_chip_configuration(&ChipConfiguration::mvlc_default()).is_ok());
    }

    #[test]
    fn test_each_mismatch_is_rejected() {
        let mutations: [fn(&mut ChipConfiguration); 6] = [
            |c| c.fifo_clock = 1,
            |c| c.fifo_mode = 0,
            |c| c.channel_config = 0,
            |c| c.power_attributes = chip::POWER_REMOTE_WAKEUP,
            |c| c.power_attributes = chip::POWER_SELF_POWERED,
            |c| c.optional_feature_support = 0x0004,
        ];
        for mutate in mutations {
            let mut conf = ChipConfiguration::mvlc_default();
            mutate(&mut conf);
            assert!(matches!(
                check_chip_configuration(&conf),
                Err(Error::ChipConfigError(_))
            ));
        }
    }

    #[test]
    fn test_decode_configuration_block() {
        let mut raw = vec![0u8; chip::CONFIGURATION_SIZE];
        raw[0..2].copy_from_slice(&0x0403u16.to_le_bytes());
        raw[2..4].copy_from_slice(&0x601Fu16.to_le_bytes());
        raw[133] = 0x60;
        raw[134..136].copy_from_slice(&96u16.to_le_bytes());
        raw[137] = chip::FIFO_CLK_100;
        raw[138] = chip::FIFO_MODE_600;
        raw[139] = chip::CHANNEL_CONFIG_2;
        raw[144..148].copy_from_slice(&0x1234_5678u32.to_le_bytes());

        let conf = ChipConfiguration::from_bytes(&raw).unwrap();
        assert_eq!(conf.vendor_id, 0x0403);
        assert_eq!(conf.product_id, 0x601F);
        assert_eq!(conf.power_consumption, 96);
        assert_eq!(conf.msio_control, 0x1234_5678);
        assert!(check_chip_configuration(&conf).is_ok());

        assert!(ChipConfiguration::from_bytes(&raw[..100]).is_none());
    }

    #[test]
    fn test_version_unpacking() {
        let v = Version::from_packed(0x0102_0019);
        assert_eq!(v, Version { major: 1, minor: 2, build: 25 });
        assert_eq!(v.to_string(), "1.2.25");
    }
}
