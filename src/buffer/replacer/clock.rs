//! CLOCK (second chance) replacement policy.

use crate::buffer::FrameId;

/// Per-frame bookkeeping for the clock sweep.
#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    /// Frame holds a page the replacer knows about.
    tracked: bool,
    /// Frame is unpinned and may be chosen as a victim.
    evictable: bool,
    /// Set on access, cleared when the hand passes.
    referenced: bool,
}

/// A CLOCK eviction policy over a fixed number of frames.
///
/// The hand sweeps frames in order; a referenced frame gets its bit cleared
/// and is skipped once, an unreferenced evictable frame is the victim.
pub struct ClockReplacer {
    slots: Vec<Slot>,
    hand: usize,
    evictable_count: usize,
}

impl ClockReplacer {
    /// Create a replacer for `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::default(); capacity],
            hand: 0,
            evictable_count: 0,
        }
    }

    /// Record that a frame was accessed.
    pub fn record_access(&mut self, frame_id: FrameId) {
        let slot = &mut self.slots[frame_id.0];
        slot.tracked = true;
        slot.referenced = true;
    }

    /// Mark a frame as evictable (pin count dropped to 0) or not.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let slot = &mut self.slots[frame_id.0];
        if !slot.tracked || slot.evictable == evictable {
            return;
        }
        slot.evictable = evictable;
        if evictable {
            self.evictable_count += 1;
        } else {
            self.evictable_count -= 1;
        }
    }

    /// Select a victim frame, or None if every tracked frame is pinned.
    pub fn evict(&mut self) -> Option<FrameId> {
        if self.evictable_count == 0 {
            return None;
        }

        // Two full sweeps always suffice: the first clears reference bits.
        for _ in 0..self.slots.len() * 2 {
            let idx = self.hand;
            self.hand = (self.hand + 1) % self.slots.len();

            let slot = &mut self.slots[idx];
            if !slot.tracked || !slot.evictable {
                continue;
            }
            if slot.referenced {
                slot.referenced = false;
                continue;
            }

            *slot = Slot::default();
            self.evictable_count -= 1;
            return Some(FrameId::new(idx));
        }
        None
    }

    /// Stop tracking a frame entirely.
    pub fn remove(&mut self, frame_id: FrameId) {
        let slot = &mut self.slots[frame_id.0];
        if slot.tracked && slot.evictable {
            self.evictable_count -= 1;
        }
        *slot = Slot::default();
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.evictable_count
    }
}
