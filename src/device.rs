//! Device discovery for MVLC controllers attached via USB.

use crate::consts;
use crate::driver::Driver;
use crate::error::Result;
use log::{debug, trace};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Flag set reported by the driver for each device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct DeviceFlags(u8);

impl DeviceFlags {
    /// The device is already opened, by this or another process.
    pub const OPENED: Self = Self(1 << 0);
    /// Enumerated at USB2 high speed.
    pub const USB2: Self = Self(1 << 1);
    /// Enumerated at USB3 super speed.
    pub const USB3: Self = Self(1 << 2);

    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for DeviceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DeviceFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Information about a USB device as reported by the driver.
///
/// A transient query result; use it to pick a device, then connect via
/// [`crate::ConnectMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Driver index; valid until the next bus change.
    pub index: u32,
    pub serial: String,
    /// USB product description, e.g. `"MVLC"`.
    pub description: String,
    pub flags: DeviceFlags,
    /// Driver specific identifier of the device (bus and address for libusb).
    pub native_id: u64,
}

impl DeviceInfo {
    #[inline]
    pub fn is_opened(&self) -> bool {
        self.flags.contains(DeviceFlags::OPENED)
    }

    #[inline]
    pub fn is_usb2(&self) -> bool {
        self.flags.contains(DeviceFlags::USB2)
    }

    #[inline]
    pub fn is_usb3(&self) -> bool {
        self.flags.contains(DeviceFlags::USB3)
    }

    /// Speed class of the link: `"USB2"`, `"USB3"` or `"unknown"`.
    pub fn speed_name(&self) -> &'static str {
        if self.is_usb2() {
            "USB2"
        } else if self.is_usb3() {
            "USB3"
        } else {
            "unknown"
        }
    }

    /// True if the description identifies an MVLC.
    pub fn is_mvlc(&self) -> bool {
        self.description.contains(consts::MVLC_DESCRIPTION_MARKER)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "index={}, serial={}, description={}, speed={}{}",
            self.index,
            self.serial,
            self.description,
            self.speed_name(),
            if self.is_opened() { ", opened" } else { "" }
        )
    }
}

/// Filter applied by [`device_info_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListOptions {
    /// Every FT60x device the driver reports.
    AllDevices,
    /// Only devices whose description contains `"MVLC"`.
    #[default]
    MvlcDevices,
}

/// Lists the devices visible to the driver, in driver index order.
pub fn device_info_list<D: Driver>(driver: &D, opts: ListOptions) -> Result<Vec<DeviceInfo>> {
    let mut devices = driver.device_list()?;
    trace!("driver reported {} device(s)", devices.len());

    if opts == ListOptions::MvlcDevices {
        devices.retain(DeviceInfo::is_mvlc);
    }

    for info in &devices {
        debug!("Found USB device: {}", info);
    }

    Ok(devices)
}

/// Finds the first MVLC with the given serial number.
/// Returns `Ok(None)` if no device matches.
pub fn device_info_by_serial<D: Driver>(driver: &D, serial: &str) -> Result<Option<DeviceInfo>> {
    Ok(device_info_list(driver, ListOptions::MvlcDevices)?
        .into_iter()
        .find(|info| info.serial == serial))
}

/// Finds the MVLC with the given driver index.
/// Returns `Ok(None)` if no device has that index.
pub fn device_info_by_index<D: Driver>(driver: &D, index: u32) -> Result<Option<DeviceInfo>> {
    Ok(device_info_list(driver, ListOptions::MvlcDevices)?
        .into_iter()
        .find(|info| info.index == index))
}
