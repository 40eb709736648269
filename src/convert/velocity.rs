//! Velocity layer registry
//!
//! Every voice or drum slot keeps the distinct velocity splits seen while
//! cataloguing, with the number of samples of each stereo role per split.

use crate::sf2::ChannelRole;
use std::collections::BTreeMap;
use std::fmt;

/// Most distinct velocity ranges tracked per slot
pub const MAX_VELOCITY_RANGES: usize = 128;

/// A melodic (bank, program) or drum (drumset, key) slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub drum: bool,
    /// Bank number, or the drumset number for drums
    pub bank: u8,
    /// Program number, or the key number for drums
    pub program: u8,
}

impl SlotKey {
    pub fn melodic(bank: u8, program: u8) -> Self {
        Self {
            drum: false,
            bank,
            program,
        }
    }

    pub fn drum(drumset: u8, key: u8) -> Self {
        Self {
            drum: true,
            bank: drumset,
            program: key,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.drum {
            write!(f, "drumset {} key {}", self.bank, self.program)
        } else {
            write!(f, "bank {} program {}", self.bank, self.program)
        }
    }
}

/// One velocity split and its per-role sample counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VelocityRange {
    pub velmin: u8,
    pub velmax: u8,
    pub mono: u16,
    pub left: u16,
    pub right: u16,
    pub other: u16,
}

impl VelocityRange {
    fn width(&self) -> i32 {
        self.velmax as i32 - self.velmin as i32
    }

    /// Samples expected in the left+mono pass
    pub fn left_and_mono(&self) -> u16 {
        self.left.saturating_add(self.mono)
    }
}

/// Known velocity splits of one slot, primary range first once sorted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VelocityRangeList {
    ranges: Vec<VelocityRange>,
}

impl VelocityRangeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[VelocityRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn primary(&self) -> Option<&VelocityRange> {
        self.ranges.first()
    }

    /// Index of the range with exactly these bounds
    pub fn find(&self, velmin: u8, velmax: u8) -> Option<usize> {
        self.ranges
            .iter()
            .position(|r| r.velmin == velmin && r.velmax == velmax)
    }

    /// Count one sample of `role` in the range (velmin, velmax)
    ///
    /// Returns false when the range could not be stored because the list is full.
    pub fn record(&mut self, velmin: u8, velmax: u8, role: ChannelRole) -> bool {
        let index = match self.find(velmin, velmax) {
            Some(i) => i,
            None if self.ranges.len() < MAX_VELOCITY_RANGES => {
                self.ranges.push(VelocityRange {
                    velmin,
                    velmax,
                    ..Default::default()
                });
                self.ranges.len() - 1
            }
            None => return false,
        };
        let range = &mut self.ranges[index];
        match role {
            ChannelRole::Right => range.right = range.right.saturating_add(1),
            ChannelRole::Left => range.left = range.left.saturating_add(1),
            ChannelRole::Mono => range.mono = range.mono.saturating_add(1),
            ChannelRole::Other(_) => {
                range.mono = range.mono.saturating_add(1);
                range.other = range.other.saturating_add(1);
            }
        }
        true
    }

    /// Move the primary range to the front
    ///
    /// The primary range is `preferred` when given and valid, otherwise the
    /// widest range (the first one on ties).
    pub fn select_primary(&mut self, preferred: Option<usize>) {
        let mut widest = 0;
        for (i, range) in self.ranges.iter().enumerate() {
            if range.width() > self.ranges[widest].width() {
                widest = i;
            }
        }
        let primary = match preferred {
            Some(i) if i < self.ranges.len() => i,
            Some(i) => {
                tracing::warn!(
                    "ignoring velocity layer override {} (only {} layers)",
                    i,
                    self.ranges.len()
                );
                widest
            }
            None => widest,
        };
        if primary != 0 {
            self.ranges.swap(0, primary);
        }
    }
}

/// Velocity range lists for every slot of a bank
#[derive(Debug, Clone, Default)]
pub struct VelocityRegistry {
    lists: BTreeMap<SlotKey, VelocityRangeList>,
}

impl VelocityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, slot: SlotKey, velmin: u8, velmax: u8, role: ChannelRole) {
        let list = self.lists.entry(slot).or_default();
        if !list.record(velmin, velmax, role) {
            tracing::warn!(
                "{}: too many velocity ranges, dropping {}-{}",
                slot,
                velmin,
                velmax
            );
        }
    }

    pub fn get(&self, slot: &SlotKey) -> Option<&VelocityRangeList> {
        self.lists.get(slot)
    }

    pub fn select_primary(&mut self, slot: &SlotKey, preferred: Option<usize>) {
        if let Some(list) = self.lists.get_mut(slot) {
            list.select_primary(preferred);
        }
    }

    /// Forget a slot after its patch could not be built
    pub fn discard(&mut self, slot: &SlotKey) {
        self.lists.remove(slot);
    }

    pub fn slots(&self) -> impl Iterator<Item = &SlotKey> {
        self.lists.keys()
    }
}
