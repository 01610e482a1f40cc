//! Traits and shared state of the six graphics objects.
//!
//! Every object publishes a 16-bit collision word each color clock. Bit 15
//! says whether the object puts a pixel on the current clock, the low 15 bits
//! are the pair bits it takes part in. An idle object publishes the inverse of
//! its own mask, so ANDing all six words leaves exactly the pairs whose two
//! members are both drawing.

use serde::{Deserialize, Serialize};

/// Pixel-active flag inside a collision word
pub const ACTIVE_PIXEL: u16 = 0x8000;

/// Object counter value after a position strobe (RESP0, RESBL, ...).
///
/// The strobe lands later in the counter's cycle while the beam is in the
/// visible part of the line, hence the different start values.
pub fn strobe_counter(hblank: bool) -> u8 {
    if hblank {
        159
    } else {
        157
    }
}

/// Something that contributes a pixel and a collision word
pub trait GraphicsObject {
    /// Power-on state; the collision mask survives
    fn reset(&mut self);

    /// Collision word for the current clock
    fn collision(&self) -> u16;

    /// Color after this object is composited over `color_in`
    fn get_pixel(&self, color_in: u8) -> u8;

    fn appearance(&self) -> &Appearance;

    fn appearance_mut(&mut self) -> &mut Appearance;

    /// Debug visibility override, independent of the program's enable bit
    fn toggle_enabled(&mut self, enabled: bool);

    /// Debug override removing the object from collision detection while it
    /// stays visible
    fn toggle_collisions(&mut self, enabled: bool) {
        self.appearance_mut().collisions_enabled = enabled;
    }

    fn set_debug_color(&mut self, color: u8) {
        self.appearance_mut().debug_color = color;
    }

    fn enable_debug_colors(&mut self, enabled: bool) {
        self.appearance_mut().debug_colors = enabled;
    }
}

/// A sprite with its own position counter and HMOVE motion
pub trait MovableObject: GraphicsObject {
    /// Horizontal motion register write (HMP0, HMBL, ...)
    fn hm(&mut self, value: u8);

    /// Position strobe
    fn strobe(&mut self, hblank: bool);

    /// HMOVE was executed
    fn start_movement(&mut self);

    /// One step of the HMOVE ripple counter. Returns whether the object still
    /// takes extra clocks.
    fn movement_tick(&mut self, clock: u32, apply: bool) -> bool;

    /// Recompute the collision word from the current counter state
    fn render(&mut self);

    /// Advance the position counter by one clock
    fn tick(&mut self);

    /// Position counter, 0..160
    fn counter(&self) -> u8;
}

/// Color, debug overrides and collision masks shared by all objects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appearance {
    pub color: u8,
    pub debug_color: u8,
    pub debug_colors: bool,
    pub collisions_enabled: bool,
    /// Word published while the object does not draw
    inactive_mask: u16,
    collision: u16,
}

impl Appearance {
    pub fn new(inactive_mask: u16) -> Self {
        Self {
            color: 0,
            debug_color: 0,
            debug_colors: false,
            collisions_enabled: true,
            inactive_mask,
            collision: inactive_mask,
        }
    }

    /// Program state only; debug settings are owned by the overlay
    pub fn reset(&mut self) {
        self.color = 0;
        self.collision = self.inactive_mask;
    }

    /// Color registers ignore bit 0
    pub fn set_color(&mut self, value: u8) {
        self.color = value & 0xFE;
    }

    pub fn effective_color(&self) -> u8 {
        if self.debug_colors {
            self.debug_color
        } else {
            self.color
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.collision = if !active {
            self.inactive_mask
        } else if self.collisions_enabled {
            0xFFFF
        } else {
            ACTIVE_PIXEL | self.inactive_mask
        };
    }

    pub fn collision(&self) -> u16 {
        self.collision
    }

    pub fn is_active(&self) -> bool {
        self.collision & ACTIVE_PIXEL != 0
    }
}

/// HMOVE state of a movable object.
///
/// The motion register selects after how many ripple-counter steps the object
/// stops receiving extra clocks: `(value >> 4) ^ 8`, so a motion of 0 gives 8
/// extra clocks, which exactly compensates the 8 clocks of extended blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Motion {
    hmm_clocks: u32,
    is_moving: bool,
}

impl Motion {
    pub fn new() -> Self {
        Self {
            hmm_clocks: 8,
            is_moving: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn set(&mut self, value: u8) {
        self.hmm_clocks = u32::from((value >> 4) ^ 0x08);
    }

    pub fn start(&mut self) {
        self.is_moving = true;
    }

    /// Returns whether this step gives the object an extra clock
    pub fn step(&mut self, clock: u32) -> bool {
        if clock == self.hmm_clocks {
            self.is_moving = false;
        }
        self.is_moving
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }
}
