//! Debugger overrides: hide objects, exclude them from collisions, or paint
//! them in fixed colors so overlapping sprites can be told apart.

use emu_core::types::VideoStandard;
use serde::{Deserialize, Serialize};

/// One bit per graphics object, combinable with `|`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiaBits(pub u8);

impl TiaBits {
    pub const P0: TiaBits = TiaBits(0x01);
    pub const M0: TiaBits = TiaBits(0x02);
    pub const P1: TiaBits = TiaBits(0x04);
    pub const M1: TiaBits = TiaBits(0x08);
    pub const BL: TiaBits = TiaBits(0x10);
    pub const PF: TiaBits = TiaBits(0x20);
    pub const ALL: TiaBits = TiaBits(0x3F);

    pub fn contains(self, other: TiaBits) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TiaBits {
    type Output = TiaBits;

    fn bitor(self, rhs: TiaBits) -> TiaBits {
        TiaBits(self.0 | rhs.0)
    }
}

/// How a toggle call changes the selected bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Off,
    On,
    Flip,
}

/// Fixed palette used when debug colors are on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedColors {
    pub p0: u8,
    pub m0: u8,
    pub p1: u8,
    pub m1: u8,
    pub pf: u8,
    pub bl: u8,
    pub bk: u8,
}

impl FixedColors {
    pub fn for_standard(standard: VideoStandard) -> Self {
        match standard {
            VideoStandard::Ntsc => FixedColors {
                p0: 0x30,
                m0: 0x38,
                p1: 0x1C,
                m1: 0xC4,
                pf: 0x9C,
                bl: 0x66,
                bk: 0x00,
            },
            VideoStandard::Pal => FixedColors {
                p0: 0x62,
                m0: 0x4A,
                p1: 0x2E,
                m1: 0x34,
                pf: 0xBC,
                bl: 0xA6,
                bk: 0x00,
            },
        }
    }
}

/// HMOVE comb color while fixed colors are on
pub const HBLANK_DEBUG_COLOR: u8 = 0x0E;

/// Debug settings; inert until a toggle is called
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugOverlay {
    pub sprite_bits: TiaBits,
    pub collision_bits: TiaBits,
    pub fixed_colors: bool,
}

impl Default for DebugOverlay {
    fn default() -> Self {
        Self {
            sprite_bits: TiaBits::ALL,
            collision_bits: TiaBits::ALL,
            fixed_colors: false,
        }
    }
}

/// Apply `toggle` to the `bits` of `current`. Returns the new state of the
/// selected bits (true if any of them is set).
pub fn apply_toggle(current: &mut TiaBits, bits: TiaBits, toggle: Toggle) -> bool {
    let mask = match toggle {
        Toggle::Off => 0,
        Toggle::On => bits.0,
        Toggle::Flip => !current.0 & bits.0,
    };
    current.0 = (current.0 & !bits.0) | mask;
    mask != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_modes() {
        let mut bits = TiaBits::ALL;
        assert!(!apply_toggle(&mut bits, TiaBits::P0, Toggle::Flip));
        assert!(!bits.contains(TiaBits::P0));
        assert!(bits.contains(TiaBits::M0 | TiaBits::PF));

        assert!(apply_toggle(&mut bits, TiaBits::P0, Toggle::Flip));
        assert_eq!(bits, TiaBits::ALL);

        assert!(!apply_toggle(&mut bits, TiaBits::ALL, Toggle::Off));
        assert_eq!(bits, TiaBits(0));
        assert!(apply_toggle(&mut bits, TiaBits::BL, Toggle::On));
        assert_eq!(bits, TiaBits::BL);
    }

    #[test]
    fn test_fixed_colors_differ_per_standard() {
        let ntsc = FixedColors::for_standard(VideoStandard::Ntsc);
        let pal = FixedColors::for_standard(VideoStandard::Pal);
        assert_eq!(ntsc.p0, 0x30);
        assert_eq!(pal.p0, 0x62);
        assert_eq!(ntsc.bk, pal.bk);
    }
}
