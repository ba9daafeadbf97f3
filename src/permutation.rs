//! Visiting order for one pass over the wallpaper set.
//!
//! A [`Permutation`] holds each file index in `[0, len)` exactly once plus a
//! cursor pointing at the next slot to present. Randomness is supplied by a
//! [`PositionPicker`] so callers decide whether draws come from entropy, a
//! fixed seed, or a scripted sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniformly distributed positions.
pub trait PositionPicker {
    /// Return a position drawn uniformly from `0..=upper`.
    fn pick(&mut self, upper: usize) -> usize;
}

/// [`PositionPicker`] backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngPicker<R = StdRng> {
    rng: R,
}

impl<R: Rng> RngPicker<R> {
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngPicker<StdRng> {
    /// Deterministic picker; the same seed always yields the same draws.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Picker seeded from the operating system.
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> PositionPicker for RngPicker<R> {
    fn pick(&mut self, upper: usize) -> usize {
        self.rng.random_range(0..=upper)
    }
}

/// Bijective ordering over `[0, len)` with a cursor.
///
/// The cursor is `< len` at rest. The scheduler may advance it to exactly
/// `len` to mark a completed pass; the next reconciliation wraps it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    entries: Vec<usize>,
    cursor: usize,
}

impl Permutation {
    /// Identity ordering `[0, 1, .., len - 1]`, cursor at 0.
    #[must_use]
    pub fn identity(len: usize) -> Self {
        Self {
            entries: (0..len).collect(),
            cursor: 0,
        }
    }

    /// Uniformly shuffled ordering over `[0, len)`, cursor at 0.
    pub fn shuffled(len: usize, picker: &mut impl PositionPicker) -> Self {
        let mut order = Self::identity(len);
        order.shuffle(picker);
        order
    }

    /// Rebuild from persisted parts. Returns `None` unless `entries` is a
    /// bijection over `[0, entries.len())`. A cursor past the end wraps.
    #[must_use]
    pub fn from_parts(cursor: usize, entries: Vec<usize>) -> Option<Self> {
        if !is_bijection(&entries) {
            return None;
        }
        let cursor = if entries.is_empty() {
            0
        } else {
            cursor % entries.len()
        };
        Some(Self { entries, cursor })
    }

    /// Fisher-Yates over the whole ordering. Resets the cursor.
    pub fn shuffle(&mut self, picker: &mut impl PositionPicker) {
        for slot in (1..self.entries.len()).rev() {
            let other = picker.pick(slot);
            self.entries.swap(slot, other);
        }
        self.cursor = 0;
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// File index stored at `position`.
    #[must_use]
    pub fn entry_at(&self, position: usize) -> Option<usize> {
        self.entries.get(position).copied()
    }

    /// Slot currently holding `index`. Linear scan.
    #[must_use]
    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.entries.iter().position(|&entry| entry == index)
    }

    /// File index under the cursor, if the pass is not complete.
    #[must_use]
    pub fn current(&self) -> Option<usize> {
        self.entry_at(self.cursor)
    }

    /// True once the cursor has moved past the last slot.
    #[must_use]
    pub fn is_pass_complete(&self) -> bool {
        self.cursor >= self.entries.len()
    }

    /// Move the cursor one slot forward, stopping at `len`.
    pub fn advance(&mut self) {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
    }

    pub fn set_cursor(&mut self, value: usize) {
        self.cursor = value;
    }

    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.entries
    }

    // Must be paired by the caller so the entries stay a bijection.
    pub(crate) fn insert_at(&mut self, position: usize, index: usize) {
        self.entries.insert(position, index);
    }

    pub(crate) fn remove_at(&mut self, position: usize) -> usize {
        self.entries.remove(position)
    }
}

/// True if `entries` holds every value in `[0, entries.len())` exactly once.
#[must_use]
pub fn is_bijection(entries: &[usize]) -> bool {
    let mut seen = vec![false; entries.len()];
    for &entry in entries {
        match seen.get_mut(entry) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}
