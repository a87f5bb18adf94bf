use crate::buttons::{ButtonMask, JoypadButton};

use super::gca_state::PORT_STRIDE;

/// Number of analog axes a pad reports.
pub const AXIS_COUNT: usize = 4;

const AXIS_OFFSET: usize = 5;
const AXIS_CENTER: i32 = 0x8000;
const AXIS_LIMIT: i32 = 0x1000;

/// Source bit `i` of the pressed bitfield maps to `BUTTON_MAPPING[i]`.
const BUTTON_MAPPING: [JoypadButton; 12] = [
    JoypadButton::A,
    JoypadButton::B,
    JoypadButton::X,
    JoypadButton::Y,
    JoypadButton::Left,
    JoypadButton::Right,
    JoypadButton::Down,
    JoypadButton::Up,
    JoypadButton::Start,
    JoypadButton::Select,
    JoypadButton::R,
    JoypadButton::L,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RumbleEffect {
    Strong,
    Weak,
}

/// Capability interface a logical pad exposes to the host input core.
pub trait Pad {
    /// Feed one raw packet for this pad.
    fn packet_handler(&mut self, packet: &[u8]);

    fn set_rumble(&mut self, effect: RumbleEffect, strength: u16);

    fn buttons(&self) -> ButtonMask;

    fn axis(&self, axis: usize) -> i16;

    fn name(&self) -> &str;

    /// Slot this pad occupies in the device-slot table.
    fn slot(&self) -> usize;
}

/// A single Gamecube controller plugged into one adapter port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcaPad {
    slot: usize,
    port: usize,
    data: [u8; PORT_STRIDE],
    buttons: ButtonMask,
    name: String,
}

impl GcaPad {
    pub fn new(slot: usize, port: usize, adapter_name: &str) -> Self {
        Self {
            slot,
            port,
            data: [0; PORT_STRIDE],
            buttons: ButtonMask::NONE,
            name: format!("{adapter_name} [Port {}]", port + 1),
        }
    }

    pub fn port(&self) -> usize {
        self.port
    }

    /// Last raw packet, starting with the port status byte.
    pub fn raw(&self) -> &[u8; PORT_STRIDE] {
        &self.data
    }

    fn decode_buttons(&self) -> ButtonMask {
        let pressed = u16::from_le_bytes([self.data[3], self.data[4]]);

        BUTTON_MAPPING
            .iter()
            .enumerate()
            .filter(|(bit, _)| pressed & (1u16 << *bit) != 0)
            .fold(ButtonMask::NONE, |mask, (_, button)| mask | *button)
    }
}

impl Pad for GcaPad {
    fn packet_handler(&mut self, packet: &[u8]) {
        let Some(dest) = self.data.get_mut(..packet.len()) else {
            return;
        };
        dest.copy_from_slice(packet);
        self.buttons = self.decode_buttons();
    }

    fn set_rumble(&mut self, _effect: RumbleEffect, _strength: u16) {
        // The adapter has no rumble output path.
    }

    fn buttons(&self) -> ButtonMask {
        self.buttons
    }

    fn axis(&self, axis: usize) -> i16 {
        if axis >= AXIS_COUNT {
            return 0;
        }

        let raw = i32::from(self.data[AXIS_OFFSET + axis]) << 8;
        let value = match axis {
            // Y axes report inverted.
            0 | 2 => AXIS_CENTER - raw,
            _ => raw - AXIS_CENTER,
        };

        // Zeroes everything beyond the limit and passes small deflections through.
        if !(-AXIS_LIMIT..=AXIS_LIMIT).contains(&value) {
            return 0;
        }

        value as i16
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn slot(&self) -> usize {
        self.slot
    }
}
