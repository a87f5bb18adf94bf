//! Decodes the state stream of a Wii U Gamecube adapter and exposes each
//! plugged-in controller as its own logical pad.

pub mod buttons;
pub mod config;
pub mod error;
pub mod gca_adapter;
pub mod slots;
pub mod transport;

pub use buttons::{ButtonMask, JoypadButton};
pub use config::{Activation, Config};
pub use error::{AdapterError, ConfigError, TransportError};
pub use gca_adapter::{GcaAdapter, GcaPad, HidDevice, Pad, PadEvent, PortStatus};
pub use slots::{PadList, SlotTable};
pub use transport::{Transport, UsbTransport};
