//! Ready-set bitmap with O(1) highest-priority lookup.
//!
//! Two levels: a group word says which 32-level groups hold at least one
//! ready priority, and one word per group holds the individual bits. Finding
//! the most urgent ready priority costs two leading-zero counts no matter
//! how many levels are in use.

use crate::Priority;

const GROUP_BITS: usize = 32;
const GROUPS: usize = Priority::LEVELS / GROUP_BITS;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadySet {
    groups: u8,
    bits: [u32; GROUPS],
}

impl ReadySet {
    pub const fn new() -> Self {
        Self {
            groups: 0,
            bits: [0; GROUPS],
        }
    }

    #[inline]
    const fn split(prio: Priority) -> (usize, u32) {
        let index = prio.index();
        (index / GROUP_BITS, 1u32 << (index % GROUP_BITS))
    }

    pub fn insert(&mut self, prio: Priority) {
        let (group, bit) = Self::split(prio);
        self.bits[group] |= bit;
        self.groups |= 1u8 << group;
    }

    pub fn remove(&mut self, prio: Priority) {
        let (group, bit) = Self::split(prio);
        self.bits[group] &= !bit;
        if self.bits[group] == 0 {
            self.groups &= !(1u8 << group);
        }
    }

    pub fn contains(&self, prio: Priority) -> bool {
        let (group, bit) = Self::split(prio);
        self.bits[group] & bit != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.groups == 0
    }

    /// Most urgent ready priority, if any
    pub fn highest(&self) -> Option<Priority> {
        if self.groups == 0 {
            return None;
        }
        let group = (7 - self.groups.leading_zeros()) as usize;
        let bit = (31 - self.bits[group].leading_zeros()) as usize;
        Some(Priority::new_unchecked((group * GROUP_BITS + bit) as u8))
    }

    /// Number of ready priorities
    pub fn len(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ReadySet {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "ReadySet{{ groups: {=u8:b} }}", self.groups);
    }
}
