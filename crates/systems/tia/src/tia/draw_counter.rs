//! Position counter decodes that start a sprite copy.
//!
//! NUSIZ bits 0-2 select how many copies of a player (and its missile) are
//! drawn and how far apart. Every configuration draws the main copy when the
//! counter passes 156; the extra copies start 16, 32 or 64 clocks after it.

const MAIN_COPY: u8 = 156;

const DECODES: [&[u8]; 8] = [
    &[MAIN_COPY],         // one copy
    &[MAIN_COPY, 12],     // two copies, close
    &[MAIN_COPY, 28],     // two copies, medium
    &[MAIN_COPY, 12, 28], // three copies, close
    &[MAIN_COPY, 60],     // two copies, wide
    &[MAIN_COPY],         // double size player
    &[MAIN_COPY, 28, 60], // three copies, medium
    &[MAIN_COPY],         // quad size player
];

/// Does a copy start when the counter is at `counter`?
pub fn starts_copy(nusiz: u8, counter: u8) -> bool {
    DECODES[usize::from(nusiz & 0x07)].contains(&counter)
}

/// Ball has no copies
pub fn starts_ball(counter: u8) -> bool {
    counter == MAIN_COPY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_counts() {
        let copies: Vec<usize> = (0..8)
            .map(|nusiz| (0..160).filter(|&c| starts_copy(nusiz, c)).count())
            .collect();
        assert_eq!(copies, vec![1, 2, 2, 3, 2, 1, 3, 1]);
    }

    #[test]
    fn test_ignores_upper_nusiz_bits() {
        assert!(starts_copy(0x31, 12));
        assert!(!starts_copy(0x30, 12));
        assert!(starts_ball(156));
        assert!(!starts_ball(12));
    }
}
