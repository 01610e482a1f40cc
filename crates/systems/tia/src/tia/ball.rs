//! Ball (ENABL)

use serde::{Deserialize, Serialize};

use super::draw_counter::starts_ball;
use super::graphics_object::{strobe_counter, Appearance, GraphicsObject, Motion, MovableObject};
use super::missile::width_from;

const RENDER_COUNTER_OFFSET: i32 = -4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    appearance: Appearance,
    motion: Motion,

    counter: u8,
    is_rendering: bool,
    render_counter: i32,
    width: i32,

    enabled_new: bool,
    enabled_old: bool,
    is_delayed: bool,
    is_suppressed: bool,
    is_enabled: bool,
}

impl Ball {
    pub fn new(inactive_mask: u16) -> Self {
        Self {
            appearance: Appearance::new(inactive_mask),
            motion: Motion::new(),
            counter: 0,
            is_rendering: false,
            render_counter: 0,
            width: 1,
            enabled_new: false,
            enabled_old: false,
            is_delayed: false,
            is_suppressed: false,
            is_enabled: false,
        }
    }

    pub fn enabl(&mut self, value: u8) {
        self.enabled_new = value & 0x02 != 0;
        self.update_enabled();
    }

    pub fn vdelbl(&mut self, value: u8) {
        self.is_delayed = value & 0x01 != 0;
        self.update_enabled();
    }

    /// Size lives in CTRLPF bits 4-5
    pub fn ctrlpf(&mut self, value: u8) {
        self.width = width_from(value);
    }

    /// GRP1 writes latch the vertical delay copy
    pub fn shuffle_status(&mut self) {
        self.enabled_old = self.enabled_new;
        self.update_enabled();
    }

    pub fn set_color(&mut self, value: u8) {
        self.appearance.set_color(value);
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    fn update_enabled(&mut self) {
        let enabled = if self.is_delayed {
            self.enabled_old
        } else {
            self.enabled_new
        };
        self.is_enabled = !self.is_suppressed && enabled;
    }
}

impl GraphicsObject for Ball {
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
        self.update_enabled();
    }
}

impl MovableObject for Ball {
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
        let active = self.is_enabled && self.is_rendering && self.render_counter >= 0;
        self.appearance.set_active(active);
    }

    fn tick(&mut self) {
        if starts_ball(self.counter) {
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
