//! USB transport for fastboot devices.

use crate::config::DeviceConfig;
use crate::error::TransportError;
use crate::fastboot::{FastbootTransport, TransferProgress};
use nusb::transfer::{Direction, EndpointType, RequestBuffer};
use nusb::{DeviceInfo, Interface};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// A fastboot-capable USB device seen during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastbootDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub bus_number: u8,
    pub device_address: u8,
    pub interface_number: u8,
}

/// List every connected device exposing a fastboot interface that passes the
/// filters in `config`.
pub fn list_fastboot_devices(config: &DeviceConfig) -> Result<Vec<FastbootDeviceInfo>, TransportError> {
    let devices = nusb::list_devices()?
        .filter_map(|d| {
            let interface_number = fastboot_interface(&d, config)?;
            config
                .matches(d.vendor_id(), d.product_id(), d.serial_number())
                .then(|| FastbootDeviceInfo {
                    vendor_id: d.vendor_id(),
                    product_id: d.product_id(),
                    serial: d.serial_number().map(str::to_string),
                    manufacturer: d.manufacturer_string().map(str::to_string),
                    product: d.product_string().map(str::to_string),
                    bus_number: d.bus_number(),
                    device_address: d.device_address(),
                    interface_number,
                })
        })
        .collect();
    Ok(devices)
}

fn fastboot_interface(device_info: &DeviceInfo, config: &DeviceConfig) -> Option<u8> {
    let (class, subclass, protocol) = config.interface_class;
    device_info
        .interfaces()
        .find(|i| i.class() == class && i.subclass() == subclass && i.protocol() == protocol)
        .map(|i| i.interface_number())
}

struct Link {
    interface: Interface,
    endpoint_out: u8,
    endpoint_in: u8,
}

/// Fastboot over USB bulk endpoints.
pub struct UsbFastboot {
    config: DeviceConfig,
    link: Option<Link>,
}

impl UsbFastboot {
    pub fn new(config: DeviceConfig) -> Self {
        Self { config, link: None }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Release the interface.
    pub fn close(&mut self) {
        if self.link.take().is_some() {
            info!("Fastboot interface released");
        }
    }

    fn link(&self) -> Result<&Link, TransportError> {
        self.link.as_ref().ok_or(TransportError::NotConnected)
    }

    async fn open(&self) -> Result<Link, TransportError> {
        info!("Searching for fastboot device...");
        let device_info = nusb::list_devices()?
            .find(|d| {
                fastboot_interface(d, &self.config).is_some()
                    && self.config.matches(d.vendor_id(), d.product_id(), d.serial_number())
            })
            .ok_or(TransportError::DeviceNotFound)?;
        let interface_number = fastboot_interface(&device_info, &self.config).ok_or(TransportError::DeviceNotFound)?;

        info!(
            "Found device {:04x}:{:04x} on bus {} addr {} (serial: {})",
            device_info.vendor_id(),
            device_info.product_id(),
            device_info.bus_number(),
            device_info.device_address(),
            device_info.serial_number().unwrap_or("<none>")
        );

        let device = device_info.open()?;
        if self.config.reset_before_claim {
            info!("Performing USB device reset...");
            device.reset()?;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let (class, subclass, protocol) = self.config.interface_class;
        let configuration = device
            .active_configuration()
            .map_err(|e| TransportError::Configuration(e.to_string()))?;
        let alt_setting = configuration
            .interface_alt_settings()
            .find(|a| {
                a.interface_number() == interface_number
                    && a.class() == class
                    && a.subclass() == subclass
                    && a.protocol() == protocol
            })
            .ok_or_else(|| TransportError::Configuration(format!("interface {interface_number} has no descriptor")))?;

        let bulk_endpoint = |direction: Direction| {
            alt_setting
                .endpoints()
                .find(|ep| ep.transfer_type() == EndpointType::Bulk && ep.direction() == direction)
                .map(|ep| ep.address())
        };
        let endpoint_out = bulk_endpoint(Direction::Out)
            .ok_or_else(|| TransportError::Configuration("no bulk OUT endpoint".to_string()))?;
        let endpoint_in = bulk_endpoint(Direction::In)
            .ok_or_else(|| TransportError::Configuration("no bulk IN endpoint".to_string()))?;

        let interface = device.detach_and_claim_interface(interface_number)?;
        info!(
            interface = interface_number,
            "Interface claimed, endpoints OUT=0x{:02x} IN=0x{:02x}", endpoint_out, endpoint_in
        );

        Ok(Link {
            interface,
            endpoint_out,
            endpoint_in,
        })
    }

    async fn write(&self, data: Vec<u8>, limit: Duration) -> Result<(), TransportError> {
        let link = self.link()?;
        let expected = data.len();
        let completion = timeout(limit, link.interface.bulk_out(link.endpoint_out, data)).await?;
        let written = completion.into_result()?;
        if written.actual_length() != expected {
            return Err(TransportError::ShortWrite {
                expected,
                actual: written.actual_length(),
            });
        }
        Ok(())
    }
}

impl FastbootTransport for UsbFastboot {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.link.is_none() {
            self.link = Some(self.open().await?);
        }
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<(), TransportError> {
        debug!(bytes = hex::encode(command), "USB Write");
        self.write(command.as_bytes().to_vec(), self.config.command_timeout)
            .await
    }

    async fn read_response(&mut self) -> Result<String, TransportError> {
        let link = self.link()?;
        let request = RequestBuffer::new(self.config.response_len);
        let completion = timeout(self.config.command_timeout, link.interface.bulk_in(link.endpoint_in, request)).await?;
        let data = completion.into_result()?;
        debug!(bytes = hex::encode(&data), "USB Read");
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    async fn send_raw_payload(
        &mut self,
        data: &[u8],
        progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<(), TransportError> {
        let total = data.len();
        let mut sent = 0;
        for chunk in data.chunks(self.config.chunk_size.max(1)) {
            self.write(chunk.to_vec(), self.config.transfer_timeout).await?;
            sent += chunk.len();
            debug!(sent, total, "Payload chunk written");
            progress(TransferProgress { sent, total });
        }
        Ok(())
    }
}
