//! Device selection and transfer settings.

use crate::constants::{FASTBOOT_CLASS, FASTBOOT_PROTOCOL, FASTBOOT_SUBCLASS, MAX_RESPONSE_LEN};
use std::time::Duration;

/// Default timeout for a command packet and each response packet. The unlock
/// reply only arrives after the user confirms on the device.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for one raw payload chunk
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);

/// Default size of one raw payload write
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// How to find and talk to a fastboot device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Only match this vendor ID
    pub vendor_id: Option<u16>,
    /// Only match this product ID
    pub product_id: Option<u16>,
    /// Only match this serial number
    pub serial: Option<String>,
    /// Interface class/subclass/protocol identifying fastboot
    pub interface_class: (u8, u8, u8),
    pub command_timeout: Duration,
    pub transfer_timeout: Duration,
    /// Size of the buffer for one response packet
    pub response_len: usize,
    pub chunk_size: usize,
    /// Reset the device before claiming the interface
    pub reset_before_claim: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: None,
            product_id: None,
            serial: None,
            interface_class: (FASTBOOT_CLASS, FASTBOOT_SUBCLASS, FASTBOOT_PROTOCOL),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            response_len: MAX_RESPONSE_LEN,
            chunk_size: DEFAULT_CHUNK_SIZE,
            reset_before_claim: false,
        }
    }
}

impl DeviceConfig {
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    pub fn with_ids(mut self, vendor_id: Option<u16>, product_id: Option<u16>) -> Self {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self
    }

    pub fn with_reset(mut self) -> Self {
        self.reset_before_claim = true;
        self
    }

    /// Whether a device with these IDs and serial passes the filters.
    pub fn matches(&self, vendor_id: u16, product_id: u16, serial: Option<&str>) -> bool {
        self.vendor_id.is_none_or(|v| v == vendor_id)
            && self.product_id.is_none_or(|p| p == product_id)
            && self.serial.as_deref().is_none_or(|s| Some(s) == serial)
    }
}
