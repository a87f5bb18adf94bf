use std::time::Duration;

use rusb::{Context, DeviceHandle, UsbContext};
use tracing::{debug, info, warn};

use crate::{config::Config, error::TransportError};

/// Raw I/O channel to one attached adapter.
pub trait Transport {
    /// Write a control/output packet; the whole packet must be accepted.
    fn send_control(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Blocking read of one inbound packet into `buf`, returning its length.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Usb(rusb::Error::Timeout))
    }
}

/// Interrupt-endpoint transport to the first matching device on the USB bus.
pub struct UsbTransport {
    _context: Context,
    handle: DeviceHandle<Context>,
    interface: u8,
    endpoint_in: u8,
    endpoint_out: u8,
    timeout: Duration,
}

impl UsbTransport {
    pub fn open(config: &Config) -> Result<Self, TransportError> {
        let context = Context::new()?;
        let mut handle = None;

        for device in context.devices()?.iter() {
            let desc = device.device_descriptor()?;
            if desc.vendor_id() == config.vendor_id && desc.product_id() == config.product_id {
                debug!(
                    "Found {:04x}:{:04x} on bus {} address {}",
                    desc.vendor_id(),
                    desc.product_id(),
                    device.bus_number(),
                    device.address()
                );
                handle = Some(device.open()?);
                break;
            }
        }

        let Some(mut handle) = handle else {
            return Err(TransportError::NoDevice {
                vendor_id: config.vendor_id,
                product_id: config.product_id,
            });
        };

        if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
            warn!("Kernel driver auto-detach unavailable: {}", err);
        }
        handle.claim_interface(config.interface)?;
        info!("Claimed interface {}", config.interface);

        Ok(Self {
            _context: context,
            handle,
            interface: config.interface,
            endpoint_in: config.endpoint_in,
            endpoint_out: config.endpoint_out,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }
}

impl Transport for UsbTransport {
    fn send_control(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let written = self
            .handle
            .write_interrupt(self.endpoint_out, data, self.timeout)?;
        if written != data.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: data.len(),
            });
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(self
            .handle
            .read_interrupt(self.endpoint_in, buf, self.timeout)?)
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        if let Err(err) = self.handle.release_interface(self.interface) {
            debug!("Releasing interface {} failed: {}", self.interface, err);
        }
    }
}
