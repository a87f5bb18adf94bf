use thiserror::Error;

/// Failures of the USB transport underneath the adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("no device {vendor_id:04x}:{product_id:04x} found")]
    NoDevice { vendor_id: u16, product_id: u16 },

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
}

/// Failures while bringing an adapter online.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("activation write failed: {0}")]
    Activation(#[source] TransportError),

    #[error("priming read failed: {0}")]
    PrimingRead(#[source] TransportError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}
