//! Collision latches.
//!
//! The fifteen object pairs each own one bit of a 15-bit word. An object's
//! mask has the bits of every pair it belongs to; two objects collide when
//! the AND of their masks is non-zero in the accumulated word.

pub const PLAYER0: u16 = 0b0111_1100_0000_0000;
pub const PLAYER1: u16 = 0b0100_0011_1100_0000;
pub const MISSILE0: u16 = 0b0010_0010_0011_1000;
pub const MISSILE1: u16 = 0b0001_0001_0010_0110;
pub const BALL: u16 = 0b0000_1000_1001_0101;
pub const PLAYFIELD: u16 = 0b0000_0100_0100_1011;

/// Word an object publishes while it is not drawing
pub const fn inactive(mask: u16) -> u16 {
    !mask & 0x7FFF
}

/// Read registers CXM0P..CXPPMM, indexed by `address & 0x0F`.
/// Each entry gives the pairs reported in bit 6 and bit 7.
const READ_PAIRS: [(Option<(u16, u16)>, (u16, u16)); 8] = [
    (Some((MISSILE0, PLAYER0)), (MISSILE0, PLAYER1)),   // CXM0P
    (Some((MISSILE1, PLAYER1)), (MISSILE1, PLAYER0)),   // CXM1P
    (Some((PLAYER0, BALL)), (PLAYER0, PLAYFIELD)),      // CXP0FB
    (Some((PLAYER1, BALL)), (PLAYER1, PLAYFIELD)),      // CXP1FB
    (Some((MISSILE0, BALL)), (MISSILE0, PLAYFIELD)),    // CXM0FB
    (Some((MISSILE1, BALL)), (MISSILE1, PLAYFIELD)),    // CXM1FB
    (None, (BALL, PLAYFIELD)),                          // CXBLPF
    (Some((MISSILE0, MISSILE1)), (PLAYER0, PLAYER1)),   // CXPPMM
];

fn pair_set(accumulator: u16, (a, b): (u16, u16)) -> bool {
    accumulator & a & b != 0
}

/// Bits 6 and 7 of collision register `index` (0..8)
pub fn read_register(accumulator: u16, index: usize) -> u8 {
    let (bit6, bit7) = READ_PAIRS[index];
    let mut result = 0;
    if bit6.is_some_and(|pair| pair_set(accumulator, pair)) {
        result |= 0x40;
    }
    if pair_set(accumulator, bit7) {
        result |= 0x80;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [u16; 6] = [PLAYER0, PLAYER1, MISSILE0, MISSILE1, BALL, PLAYFIELD];

    #[test]
    fn test_every_pair_owns_exactly_one_bit() {
        for (i, a) in ALL.iter().enumerate() {
            for b in &ALL[i + 1..] {
                assert_eq!((a & b).count_ones(), 1, "{:#06x} & {:#06x}", a, b);
            }
        }
        let union = ALL.iter().fold(0, |acc, mask| acc | mask);
        assert_eq!(union, 0x7FFF);
    }

    #[test]
    fn test_and_of_words_isolates_pair() {
        // Player 0 and ball drawing, everything else idle
        let drawing = 0xFFFFu16;
        let word = drawing
            & inactive(PLAYER1)
            & inactive(MISSILE0)
            & inactive(MISSILE1)
            & drawing
            & inactive(PLAYFIELD);
        assert_eq!(word & 0x7FFF, PLAYER0 & BALL);
    }

    #[test]
    fn test_read_mapping() {
        assert_eq!(read_register(MISSILE0 & PLAYER1, 0), 0x80);
        assert_eq!(read_register(MISSILE0 & PLAYER0, 0), 0x40);
        assert_eq!(read_register(MISSILE1 & PLAYER0, 1), 0x80);
        assert_eq!(read_register(PLAYER1 & PLAYFIELD, 3), 0x80);
        assert_eq!(read_register(BALL & PLAYFIELD, 6), 0x80);
        assert_eq!(read_register(0x7FFF, 6), 0x80);
        assert_eq!(read_register(MISSILE0 & MISSILE1, 7), 0x40);
        assert_eq!(read_register(0x7FFF, 7), 0xC0);
        assert_eq!(read_register(0, 2), 0x00);
    }
}
