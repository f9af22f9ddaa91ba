//! Replay of a recorded macro.

use crate::arena::{Entry, SlotId};
use crate::held_buffer::HeldBuffer;
use crate::keycode::KeyCode;

/// Where a playing macro reads its entries and sends its keystrokes to.
pub trait PlaybackTarget {
    /// Recorded entry `index` of `slot`, `None` past the end
    fn entry(&self, slot: SlotId, index: usize) -> Option<Entry>;

    /// Synthesize a key press
    fn press(&mut self, key: KeyCode);

    /// Synthesize a key release
    fn release(&mut self, key: KeyCode);

    /// Release all keys, then hold `held` again without pressing them anew
    fn restore_held(&mut self, held: &[KeyCode]);

    /// Release all keys
    fn release_all(&mut self);

    /// Send the current report to the host
    fn flush_report(&mut self);
}

/// Where a played macro is in its current entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Stage {
    /// Start the next entry
    Next,
    /// The key of the entry was pressed, the report isn't sent yet
    Pressed(Entry),
    /// Release the key of a tap
    Releasing(KeyCode),
}

/// Replays all entries of a slot in recorded order, one step at a time.
///
/// Every step sends at most one report, so that the caller can wait for the host to take it
/// before the next one. A step may start another macro through [`PlaybackTarget::press`], which
/// then plays before this one continues.
///
/// Synthesized events don't go through the normal hold tracking, so after each release the state of
/// every key still held by the macro is sent again. All keys are released when the macro ends, even
/// if it ended in the middle of a chord.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Player {
    slot: SlotId,
    index: usize,
    held: HeldBuffer,
    stage: Stage,
}

impl Player {
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            index: 0,
            held: HeldBuffer::new(),
            stage: Stage::Next,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Play the next step. Returns `false` once the macro has ended, don't call it again after that
    pub fn step<T: PlaybackTarget>(&mut self, target: &mut T) -> bool {
        match self.stage {
            Stage::Next => {
                let Some(entry) = target.entry(self.slot, self.index) else {
                    target.release_all();
                    target.flush_report();
                    trace!("Played {} entries from slot {}", self.index, self.slot.offset());
                    return false;
                };
                if entry.kind.presses() {
                    target.press(entry.key);
                    self.stage = Stage::Pressed(entry);
                } else {
                    self.release(target, entry.key);
                }
            }
            Stage::Pressed(entry) => {
                target.flush_report();
                self.held.push(entry.key);
                if entry.kind.releases() {
                    self.stage = Stage::Releasing(entry.key);
                } else {
                    self.next_entry();
                }
            }
            Stage::Releasing(key) => self.release(target, key),
        }
        true
    }

    fn release<T: PlaybackTarget>(&mut self, target: &mut T, key: KeyCode) {
        target.release(key);
        self.held.remove(key);
        target.restore_held(self.held.as_slice());
        target.flush_report();
        self.next_entry();
    }

    fn next_entry(&mut self) {
        self.index += 1;
        self.stage = Stage::Next;
    }
}
