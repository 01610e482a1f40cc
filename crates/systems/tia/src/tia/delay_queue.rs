//! Pending register writes whose effect lags the CPU write.
//!
//! Most TIA registers take effect a few color clocks after the bus write
//! because the value has to propagate through latches. The queue holds at most
//! one entry per register: writing a register that is still pending replaces
//! the value but keeps the countdown, like the physical latch would.

use serde::{Deserialize, Serialize};

/// Registers whose writes go through the delay queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DelayedRegister {
    #[default]
    Vblank,
    Hmove,
    Pf0,
    Pf1,
    Pf2,
    Grp0,
    Grp1,
    /// Latch player 0's new pattern into its old (VDELP0) copy
    ShuffleP0,
    /// Latch player 1's new pattern into its old (VDELP1) copy
    ShuffleP1,
    Hmp0,
    Hmp1,
    Hmm0,
    Hmm1,
    Hmbl,
    Hmclr,
    Refp0,
    Refp1,
}

impl DelayedRegister {
    /// Number of distinct delayed registers, which bounds the queue length
    pub const COUNT: usize = 17;

    /// Color clocks between the write and its effect
    pub fn delay(self) -> u8 {
        match self {
            DelayedRegister::Hmove => 6,
            DelayedRegister::Pf0 | DelayedRegister::Pf1 | DelayedRegister::Pf2 => 2,
            DelayedRegister::Grp0 | DelayedRegister::Grp1 => 1,
            DelayedRegister::ShuffleP0 | DelayedRegister::ShuffleP1 => 1,
            DelayedRegister::Hmp0
            | DelayedRegister::Hmp1
            | DelayedRegister::Hmm0
            | DelayedRegister::Hmm1
            | DelayedRegister::Hmbl
            | DelayedRegister::Hmclr => 2,
            DelayedRegister::Refp0 | DelayedRegister::Refp1 => 1,
            DelayedRegister::Vblank => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct Entry {
    register: DelayedRegister,
    value: u8,
    remaining: u8,
}

/// Writes that became due on one color clock, in the order they were queued
#[derive(Debug)]
pub struct DueWrites {
    writes: [(DelayedRegister, u8); DelayedRegister::COUNT],
    len: usize,
    next: usize,
}

impl Iterator for DueWrites {
    type Item = (DelayedRegister, u8);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == self.len {
            return None;
        }
        let write = self.writes[self.next];
        self.next += 1;
        Some(write)
    }
}

/// Fixed-capacity, insertion-ordered queue of delayed writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayQueue {
    entries: [Entry; DelayedRegister::COUNT],
    len: usize,
}

impl Default for DelayQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayQueue {
    pub fn new() -> Self {
        Self {
            entries: [Entry::default(); DelayedRegister::COUNT],
            len: 0,
        }
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Schedule `register` to receive `value` after its fixed delay.
    ///
    /// If the register is already pending only the value changes.
    pub fn push(&mut self, register: DelayedRegister, value: u8) {
        if let Some(entry) = self.entries[..self.len]
            .iter_mut()
            .find(|entry| entry.register == register)
        {
            entry.value = value;
            return;
        }

        let delay = register.delay();
        debug_assert!(delay > 0, "{:?} has no delay", register);
        // One slot per distinct register, so this cannot overflow
        self.entries[self.len] = Entry {
            register,
            value,
            remaining: delay,
        };
        self.len += 1;
    }

    /// Pending value for `register`, if any
    pub fn pending(&self, register: DelayedRegister) -> Option<u8> {
        self.entries[..self.len]
            .iter()
            .find(|entry| entry.register == register)
            .map(|entry| entry.value)
    }

    /// Advance all countdowns by one color clock and remove the entries that
    /// reached zero.
    pub fn execute(&mut self) -> DueWrites {
        let mut due = DueWrites {
            writes: [(DelayedRegister::Vblank, 0); DelayedRegister::COUNT],
            len: 0,
            next: 0,
        };

        let mut kept = 0;
        for i in 0..self.len {
            let mut entry = self.entries[i];
            entry.remaining -= 1;
            if entry.remaining == 0 {
                due.writes[due.len] = (entry.register, entry.value);
                due.len += 1;
            } else {
                self.entries[kept] = entry;
                kept += 1;
            }
        }
        self.len = kept;

        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_due_after_exact_delay() {
        let mut queue = DelayQueue::new();
        queue.push(DelayedRegister::Pf1, 0xAA);

        assert_eq!(queue.execute().count(), 0);
        let due: Vec<_> = queue.execute().collect();
        assert_eq!(due, vec![(DelayedRegister::Pf1, 0xAA)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_hmove_has_longest_delay() {
        let mut queue = DelayQueue::new();
        queue.push(DelayedRegister::Hmove, 0);
        for _ in 0..5 {
            assert_eq!(queue.execute().count(), 0);
        }
        assert_eq!(queue.execute().count(), 1);
    }

    #[test]
    fn test_duplicate_push_overwrites_value_and_keeps_countdown() {
        let mut queue = DelayQueue::new();
        queue.push(DelayedRegister::Pf0, 0x10);
        assert_eq!(queue.execute().count(), 0);

        queue.push(DelayedRegister::Pf0, 0x20);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending(DelayedRegister::Pf0), Some(0x20));

        let due: Vec<_> = queue.execute().collect();
        assert_eq!(due, vec![(DelayedRegister::Pf0, 0x20)]);
    }

    #[test]
    fn test_entries_due_together_keep_push_order() {
        let mut queue = DelayQueue::new();
        queue.push(DelayedRegister::Hmp0, 0x70);
        queue.push(DelayedRegister::Hmclr, 0);
        queue.push(DelayedRegister::Grp0, 0xFF);

        let first: Vec<_> = queue.execute().collect();
        assert_eq!(first, vec![(DelayedRegister::Grp0, 0xFF)]);

        let second: Vec<_> = queue.execute().collect();
        assert_eq!(
            second,
            vec![(DelayedRegister::Hmp0, 0x70), (DelayedRegister::Hmclr, 0)]
        );
    }

    #[test]
    fn test_every_register_fits() {
        use DelayedRegister::*;
        let mut queue = DelayQueue::new();
        for register in [
            Vblank, Hmove, Pf0, Pf1, Pf2, Grp0, Grp1, ShuffleP0, ShuffleP1, Hmp0, Hmp1, Hmm0,
            Hmm1, Hmbl, Hmclr, Refp0, Refp1,
        ] {
            queue.push(register, 1);
            queue.push(register, 2);
        }
        assert_eq!(queue.len(), DelayedRegister::COUNT);

        let total: usize = (0..6).map(|_| queue.execute().count()).sum();
        assert_eq!(total, DelayedRegister::COUNT);
    }

    #[test]
    fn test_reset_discards_pending() {
        let mut queue = DelayQueue::new();
        queue.push(DelayedRegister::Vblank, 0x02);
        queue.reset();
        assert_eq!(queue.execute().count(), 0);
    }
}
