use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const VID_NINTENDO: u16 = 0x057e;
pub const PID_NINTENDO_GCA: u16 = 0x0337;
pub const DEFAULT_ADAPTER_NAME: &str = "Wii U Gamecube Adapter";

/// Sequence written to the adapter once to start the state stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Activation code only.
    Standard,
    /// Mode byte followed by the activation code.
    Wii,
}

impl Activation {
    pub fn packet(self) -> &'static [u8] {
        match self {
            Activation::Standard => &[0x13],
            Activation::Wii => &[0x01, 0x13],
        }
    }
}

impl Default for Activation {
    fn default() -> Self {
        if cfg!(feature = "wii") {
            Activation::Wii
        } else {
            Activation::Standard
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub vendor_id: u16,
    pub product_id: u16,
    pub adapter_name: String,
    pub activation: Activation,
    pub interface: u8,
    pub endpoint_in: u8,
    pub endpoint_out: u8,
    pub timeout_ms: u64,
    /// Capacity of the logical pad slot table.
    pub pad_slots: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vendor_id: VID_NINTENDO,
            product_id: PID_NINTENDO_GCA,
            adapter_name: DEFAULT_ADAPTER_NAME.to_string(),
            activation: Activation::default(),
            interface: 0,
            endpoint_in: 0x81,
            endpoint_out: 0x02,
            timeout_ms: 16,
            pad_slots: 16,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load the YAML config at `path`, or `None` when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(&text).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }
}
