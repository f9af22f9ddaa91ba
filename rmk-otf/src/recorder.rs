//! Capture of live keystrokes into an arena slot.

use crate::arena::{ArenaError, Entry, EntryKind, MacroArena, SlotId, SlotKey};
use crate::event::KeyTransition;
use crate::keycode::KeyCode;

/// State of the recording in progress
#[derive(Debug, Default, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Recorder {
    /// The slot being recorded into, `None` if not recording
    slot: Option<SlotId>,
}

impl Recorder {
    pub const fn new() -> Self {
        Self { slot: None }
    }

    pub fn is_recording(&self) -> bool {
        self.slot.is_some()
    }

    pub fn slot(&self) -> Option<SlotId> {
        self.slot
    }

    /// Start recording into a fresh slot for `key`, discarding any macro already bound to it.
    ///
    /// The capacity of the new slot is fixed here, the recording can't grow afterwards.
    pub fn begin<const SIZE: usize>(&mut self, arena: &mut MacroArena<SIZE>, key: SlotKey) -> Result<SlotId, ArenaError> {
        self.slot = None;
        if let Some(old) = arena.find_slot(key) {
            arena.free(old)?;
        }
        let slot = arena.allocate(key)?;
        debug!("Start recording into slot {}", slot.offset());
        self.slot = Some(slot);
        Ok(slot)
    }

    /// Finish the recording, the recorded macro is kept
    pub fn stop(&mut self) -> Option<SlotId> {
        self.slot.take()
    }

    /// Record one key transition.
    ///
    /// Steady states are ignored. A release as the very first entry is dropped, it belongs to a key
    /// held before the recording started. A release right after the press of the same key turns the
    /// press into a tap. When the slot is full, the whole slot is freed, the recording ends and
    /// `ArenaError::SlotFull` is returned.
    pub fn record<const SIZE: usize>(
        &mut self,
        arena: &mut MacroArena<SIZE>,
        key: KeyCode,
        transition: KeyTransition,
    ) -> Result<(), ArenaError> {
        let Some(slot) = self.slot else {
            return Err(ArenaError::NotFound);
        };

        let kind = match transition {
            KeyTransition::Pressed => EntryKind::Down,
            KeyTransition::Released => EntryKind::Up,
            KeyTransition::Steady => return Ok(()),
        };

        if kind == EntryKind::Up {
            match arena.last_entry_mut(slot) {
                None => return Ok(()),
                Some(last) if last.key == key && last.kind == EntryKind::Down => {
                    last.kind = EntryKind::Tap;
                    return Ok(());
                }
                Some(_) => (),
            }
        }

        match arena.push_entry(slot, Entry::new(key, kind)) {
            Err(ArenaError::SlotFull) => {
                warn!("Macro slot {} is full, recording discarded", slot.offset());
                self.slot = None;
                arena.free(slot)?;
                Err(ArenaError::SlotFull)
            }
            Err(e) => {
                self.slot = None;
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }
}
