//! Player sprites (GRP0/GRP1)

use serde::{Deserialize, Serialize};

use super::draw_counter::starts_copy;
use super::graphics_object::{strobe_counter, Appearance, GraphicsObject, Motion, MovableObject};

/// Players start drawing five clocks after the decode
const RENDER_COUNTER_OFFSET: i32 = -5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    appearance: Appearance,
    motion: Motion,

    counter: u8,
    is_rendering: bool,
    render_counter: i32,

    nusiz: u8,
    /// Clocks per pattern bit: 1, 2 (double size) or 4 (quad size)
    divider: u8,
    width: i32,

    pattern_new: u8,
    pattern_old: u8,
    /// Effective pattern, bit 0 is the leftmost pixel
    pattern: u8,

    is_reflected: bool,
    is_delayed: bool,
    is_suppressed: bool,
}

impl Player {
    pub fn new(inactive_mask: u16) -> Self {
        Self {
            appearance: Appearance::new(inactive_mask),
            motion: Motion::new(),
            counter: 0,
            is_rendering: false,
            render_counter: 0,
            nusiz: 0,
            divider: 1,
            width: 8,
            pattern_new: 0,
            pattern_old: 0,
            pattern: 0,
            is_reflected: false,
            is_delayed: false,
            is_suppressed: false,
        }
    }

    pub fn grp(&mut self, value: u8) {
        self.pattern_new = value;
        self.update_pattern();
    }

    pub fn nusiz(&mut self, value: u8) {
        self.nusiz = value & 0x07;
        self.divider = match self.nusiz {
            5 => 2,
            7 => 4,
            _ => 1,
        };
        self.width = 8 * i32::from(self.divider);
    }

    pub fn refp(&mut self, value: u8) {
        self.is_reflected = value & 0x08 != 0;
        self.update_pattern();
    }

    pub fn vdelp(&mut self, value: u8) {
        self.is_delayed = value & 0x01 != 0;
        self.update_pattern();
    }

    /// The other player's GRP write copies the new pattern into the old one
    pub fn shuffle_patterns(&mut self) {
        self.pattern_old = self.pattern_new;
        self.update_pattern();
    }

    pub fn set_color(&mut self, value: u8) {
        self.appearance.set_color(value);
    }

    pub fn color(&self) -> u8 {
        self.appearance.color
    }

    /// Effective pattern after VDEL and REFP, bit 0 leftmost
    pub fn pattern(&self) -> u8 {
        self.pattern
    }

    /// Counter value a locked missile snaps to when RESMP is released, which
    /// puts it in the middle of the main copy
    pub fn missile_lock_counter(&self) -> u8 {
        let offset = match self.divider {
            1 => 4,
            2 => 7,
            _ => 11,
        };
        ((u16::from(self.counter) + 160 - offset) % 160) as u8
    }

    fn update_pattern(&mut self) {
        let pattern = if self.is_delayed {
            self.pattern_old
        } else {
            self.pattern_new
        };

        // GRP bit 7 is the leftmost pixel unless reflected
        self.pattern = if self.is_suppressed {
            0
        } else if self.is_reflected {
            pattern
        } else {
            pattern.reverse_bits()
        };
    }
}

impl GraphicsObject for Player {
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
        if self.appearance.is_active() {
            self.appearance.effective_color()
        } else {
            color_in
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
        self.update_pattern();
    }
}

impl MovableObject for Player {
    fn hm(&mut self, value: u8) {
        self.motion.set(value);
    }

    fn strobe(&mut self, hblank: bool) {
        self.counter = strobe_counter(hblank);
    }

    fn start_movement(&mut self) {
        self.motion.start();
    }

    fn movement_tick(&mut self, clock: u32, apply: bool) -> bool {
        if self.motion.step(clock) && apply {
            self.render();
            self.tick();
        }
        self.motion.is_moving()
    }

    fn render(&mut self) {
        let active = self.is_rendering
            && self.render_counter >= 0
            && self.pattern & (1 << (self.render_counter / i32::from(self.divider))) != 0;
        self.appearance.set_active(active);
    }

    fn tick(&mut self) {
        if starts_copy(self.nusiz, self.counter) {
            self.is_rendering = true;
            self.render_counter = RENDER_COUNTER_OFFSET;
        } else if self.is_rendering {
            self.render_counter += 1;
            if self.render_counter >= self.width {
                self.is_rendering = false;
            }
        }

        self.counter = (self.counter + 1) % 160;
    }

    fn counter(&self) -> u8 {
        self.counter
    }
}
