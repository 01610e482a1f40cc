//! Playfield (PF0-PF2) and background

use serde::{Deserialize, Serialize};

use super::graphics_object::{Appearance, GraphicsObject};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playfield {
    appearance: Appearance,

    /// 20 bits, bit 0 is the leftmost playfield column
    pattern: u32,
    effective_pattern: u32,

    /// CTRLPF reflection as written
    reflected: bool,
    /// Reflection latched for the current half line
    refp: bool,
    score_mode: bool,

    color_p0: u8,
    color_p1: u8,
    color_left: u8,
    color_right: u8,

    x: u32,
    is_suppressed: bool,
}

impl Playfield {
    pub fn new(inactive_mask: u16) -> Self {
        Self {
            appearance: Appearance::new(inactive_mask),
            pattern: 0,
            effective_pattern: 0,
            reflected: false,
            refp: false,
            score_mode: false,
            color_p0: 0,
            color_p1: 0,
            color_left: 0,
            color_right: 0,
            x: 0,
            is_suppressed: false,
        }
    }

    /// PF0 bits 4-7 are columns 0-3
    pub fn pf0(&mut self, value: u8) {
        self.pattern = (self.pattern & 0x000F_FFF0) | u32::from((value & 0xF0) >> 4);
        self.apply_pattern();
    }

    /// PF1 is drawn msb first, columns 4-11
    pub fn pf1(&mut self, value: u8) {
        self.pattern = (self.pattern & 0x000F_F00F) | (u32::from(value.reverse_bits()) << 4);
        self.apply_pattern();
    }

    /// PF2 is drawn lsb first, columns 12-19
    pub fn pf2(&mut self, value: u8) {
        self.pattern = (self.pattern & 0x0000_0FFF) | (u32::from(value) << 12);
        self.apply_pattern();
    }

    pub fn ctrlpf(&mut self, value: u8) {
        self.reflected = value & 0x01 != 0;
        self.score_mode = value & 0x06 == 0x02;
        self.apply_colors();
    }

    pub fn set_color(&mut self, value: u8) {
        self.appearance.set_color(value);
        self.apply_colors();
    }

    pub fn set_color_p0(&mut self, value: u8) {
        self.color_p0 = value & 0xFE;
        self.apply_colors();
    }

    pub fn set_color_p1(&mut self, value: u8) {
        self.color_p1 = value & 0xFE;
        self.apply_colors();
    }

    pub fn pattern(&self) -> u32 {
        self.pattern
    }

    /// Advance to column `x` of the visible line (0..160)
    pub fn tick(&mut self, x: u32) {
        self.x = x;

        if x == 0 || x == 80 {
            self.refp = self.reflected;
        }

        // Each playfield column is four clocks wide
        if x & 3 != 0 {
            return;
        }

        let column = x >> 2;
        let bit = if column < 20 {
            column
        } else if self.refp {
            39 - column
        } else {
            column - 20
        };

        self.appearance
            .set_active(self.effective_pattern & (1 << bit) != 0);
    }

    fn apply_pattern(&mut self) {
        self.effective_pattern = if self.is_suppressed { 0 } else { self.pattern };
    }

    fn apply_colors(&mut self) {
        if self.score_mode {
            self.color_left = self.color_p0;
            self.color_right = self.color_p1;
        } else {
            self.color_left = self.appearance.color;
            self.color_right = self.appearance.color;
        }
    }
}

impl GraphicsObject for Playfield {
    fn reset(&mut self) {
        let appearance = self.appearance.clone();
        *self = Self {
            appearance,
            is_suppressed: self.is_suppressed,
            ..Self::new(0)
        };
        self.appearance.reset();
    }

    fn collision(&self) -> u16 {
        self.appearance.collision()
    }

    fn get_pixel(&self, color_in: u8) -> u8 {
        if !self.appearance.is_active() {
            color_in
        } else if self.appearance.debug_colors {
            self.appearance.debug_color
        } else if self.x < 80 {
            self.color_left
        } else {
            self.color_right
        }
    }

    fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    fn appearance_mut(&mut self) -> &mut Appearance {
        &mut self.appearance
    }

    fn toggle_enabled(&mut self, enabled: bool) {
        self.is_suppressed = !enabled;
        self.apply_pattern();
    }
}

/// COLUBK; never collides and always draws
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Background {
    color: u8,
    debug_color: u8,
    debug_colors: bool,
}

impl Default for Background {
    fn default() -> Self {
        Self::new()
    }
}

impl Background {
    pub fn new() -> Self {
        Self {
            color: 0,
            debug_color: 0,
            debug_colors: false,
        }
    }

    pub fn reset(&mut self) {
        self.color = 0;
    }

    pub fn set_color(&mut self, value: u8) {
        self.color = value & 0xFE;
    }

    pub fn set_debug_color(&mut self, color: u8) {
        self.debug_color = color;
    }

    pub fn enable_debug_colors(&mut self, enabled: bool) {
        self.debug_colors = enabled;
    }

    pub fn color(&self) -> u8 {
        if self.debug_colors {
            self.debug_color
        } else {
            self.color
        }
    }
}
