//! Missile sprites (ENAM0/ENAM1)

use serde::{Deserialize, Serialize};

use super::draw_counter::starts_copy;
use super::graphics_object::{strobe_counter, Appearance, GraphicsObject, Motion, MovableObject};
use super::player::Player;

const RENDER_COUNTER_OFFSET: i32 = -4;

/// Missile and ball width in clocks, from bits 4-5 of NUSIZ/CTRLPF
pub(crate) fn width_from(value: u8) -> i32 {
    [1, 2, 4, 8][usize::from((value & 0x30) >> 4)]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Missile {
    appearance: Appearance,
    motion: Motion,

    counter: u8,
    is_rendering: bool,
    render_counter: i32,

    nusiz: u8,
    width: i32,

    enam: bool,
    /// Locked to its player (RESMP); hidden while set
    resmp: bool,
    is_suppressed: bool,
    is_enabled: bool,
}

impl Missile {
    pub fn new(inactive_mask: u16) -> Self {
        Self {
            appearance: Appearance::new(inactive_mask),
            motion: Motion::new(),
            counter: 0,
            is_rendering: false,
            render_counter: 0,
            nusiz: 0,
            width: 1,
            enam: false,
            resmp: false,
            is_suppressed: false,
            is_enabled: false,
        }
    }

    pub fn enam(&mut self, value: u8) {
        self.enam = value & 0x02 != 0;
        self.update_enabled();
    }

    /// Copies come from bits 0-2, width from bits 4-5
    pub fn nusiz(&mut self, value: u8) {
        self.nusiz = value & 0x07;
        self.width = width_from(value);
    }

    pub fn resmp(&mut self, value: u8, player: &Player) {
        let resmp = value & 0x02 != 0;
        if resmp == self.resmp {
            return;
        }

        self.resmp = resmp;
        if !resmp {
            self.counter = player.missile_lock_counter();
        }
        self.update_enabled();
    }

    pub fn set_color(&mut self, value: u8) {
        self.appearance.set_color(value);
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    fn update_enabled(&mut self) {
        self.is_enabled = !self.is_suppressed && self.enam && !self.resmp;
    }
}

impl GraphicsObject for Missile {
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

impl MovableObject for Missile {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_clocks(missile: &mut Missile) -> usize {
        (0..320)
            .map(|_| {
                missile.render();
                missile.tick();
                missile.appearance.is_active()
            })
            .skip(160)
            .filter(|&lit| lit)
            .count()
    }

    #[test]
    fn test_width_from_size_bits() {
        assert_eq!(width_from(0x00), 1);
        assert_eq!(width_from(0x10), 2);
        assert_eq!(width_from(0x20), 4);
        assert_eq!(width_from(0x37), 8);
    }

    #[test]
    fn test_disabled_missile_draws_nothing() {
        let mut missile = Missile::new(0);
        assert_eq!(lit_clocks(&mut missile), 0);
    }

    #[test]
    fn test_enabled_missile_width_and_copies() {
        let mut missile = Missile::new(0);
        missile.enam(0x02);
        missile.nusiz(0x20);
        assert_eq!(lit_clocks(&mut missile), 4);

        missile.nusiz(0x26);
        assert_eq!(lit_clocks(&mut missile), 12);
    }

    #[test]
    fn test_resmp_hides_and_recenters() {
        let mut player = Player::new(0);
        for _ in 0..40 {
            player.tick();
        }

        let mut missile = Missile::new(0);
        missile.enam(0x02);
        missile.resmp(0x02, &player);
        assert!(!missile.is_enabled());
        assert_eq!(lit_clocks(&mut missile), 0);

        missile.resmp(0x00, &player);
        assert!(missile.is_enabled());
        assert_eq!(missile.counter(), 36);
    }

    #[test]
    fn test_reset_keeps_collision_mask() {
        let mut missile = Missile::new(0x1234);
        missile.enam(0x02);
        missile.reset();
        assert_eq!(missile.collision(), 0x1234);
        assert!(!missile.is_enabled());
    }
}
