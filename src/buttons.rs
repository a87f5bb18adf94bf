use std::ops::{BitOr, BitOrAssign};

/// Canonical joypad buttons understood by the host input core.
///
/// The discriminant is the bit index used inside a [`ButtonMask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum JoypadButton {
    B = 0,
    Y = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
    A = 8,
    X = 9,
    L = 10,
    R = 11,
}

impl JoypadButton {
    pub const ALL: [JoypadButton; 12] = [
        JoypadButton::B,
        JoypadButton::Y,
        JoypadButton::Select,
        JoypadButton::Start,
        JoypadButton::Up,
        JoypadButton::Down,
        JoypadButton::Left,
        JoypadButton::Right,
        JoypadButton::A,
        JoypadButton::X,
        JoypadButton::L,
        JoypadButton::R,
    ];

    #[inline]
    pub const fn bit(self) -> u16 {
        1 << self as u8
    }
}

/// Pressed-state bitmask over [`JoypadButton`] identifiers.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct ButtonMask(pub u16);

impl ButtonMask {
    pub const NONE: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn with(self, button: JoypadButton) -> Self {
        Self(self.0 | button.bit())
    }

    #[inline]
    #[must_use]
    pub const fn is_pressed(self, button: JoypadButton) -> bool {
        self.0 & button.bit() != 0
    }

    #[inline]
    pub fn set(&mut self, button: JoypadButton) {
        self.0 |= button.bit();
    }

    /// Iterate over the pressed buttons in bit order.
    pub fn pressed(self) -> impl Iterator<Item = JoypadButton> {
        JoypadButton::ALL
            .into_iter()
            .filter(move |button| self.is_pressed(*button))
    }
}

impl From<JoypadButton> for ButtonMask {
    fn from(button: JoypadButton) -> Self {
        Self(button.bit())
    }
}

impl BitOr<JoypadButton> for ButtonMask {
    type Output = Self;

    fn bitor(self, rhs: JoypadButton) -> Self {
        self.with(rhs)
    }
}

impl BitOrAssign<JoypadButton> for ButtonMask {
    fn bitor_assign(&mut self, rhs: JoypadButton) {
        self.set(rhs);
    }
}
