mod gca_adapter;
mod gca_pad;
mod gca_state;

pub use gca_adapter::{GcaAdapter, HidDevice, PadEvent};
pub use gca_pad::{GcaPad, Pad, RumbleEffect, AXIS_COUNT};
pub use gca_state::{GcaState, PortStatus, PORT_COUNT, PORT_STRIDE, STATE_LEN};
