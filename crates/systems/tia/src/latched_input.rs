//! Fire button inputs INPT4/INPT5.
//!
//! With VBLANK bit 6 set the port latches: once the button has been seen
//! pressed it reads pressed until latching is switched off again.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatchedInput {
    mode_latched: bool,
    latched_value: u8,
}

impl Default for LatchedInput {
    fn default() -> Self {
        Self::new()
    }
}

impl LatchedInput {
    pub fn new() -> Self {
        Self {
            mode_latched: false,
            latched_value: 0x80,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn vblank(&mut self, value: u8) {
        if value & 0x40 != 0 {
            self.mode_latched = true;
        } else {
            self.mode_latched = false;
            self.latched_value = 0x80;
        }
    }

    /// Bit 7 of the port, low while the button is pressed
    pub fn inpt(&mut self, pressed: bool) -> u8 {
        let value = if pressed { 0x00 } else { 0x80 };

        if self.mode_latched {
            self.latched_value &= value;
            self.latched_value
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlatched_follows_button() {
        let mut input = LatchedInput::new();
        assert_eq!(input.inpt(false), 0x80);
        assert_eq!(input.inpt(true), 0x00);
        assert_eq!(input.inpt(false), 0x80);
    }

    #[test]
    fn test_latched_holds_press() {
        let mut input = LatchedInput::new();
        input.vblank(0x40);
        assert_eq!(input.inpt(false), 0x80);
        assert_eq!(input.inpt(true), 0x00);
        assert_eq!(input.inpt(false), 0x00);

        input.vblank(0x00);
        assert_eq!(input.inpt(false), 0x80);
    }
}
