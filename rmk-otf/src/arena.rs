//! Fixed-size storage for all recorded macros.
//!
//! The arena is split into slots which cover it contiguously, without gaps: every slot owns a
//! header unit followed by its allocated entries, and the next slot starts right after the last
//! allocated entry. There is no free list. Free space is always the unused tail of some slot, so a
//! new slot is carved out of the slot with the largest tail, and a freed slot is donated to the
//! slot before it.

use heapless::Vec;

use crate::MACRO_ARENA_SIZE;
use crate::hid_state::HidModifiers;
use crate::keycode::KeyCode;

/// Size of a slot header, in entry units
pub const HEADER_SIZE: usize = 1;

/// Kind of a recorded keystroke
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EntryKind {
    Down,
    Up,
    /// A `Down` immediately followed by the `Up` of the same key
    Tap,
}

impl EntryKind {
    /// Playing this entry presses the key
    pub fn presses(self) -> bool {
        matches!(self, EntryKind::Down | EntryKind::Tap)
    }

    /// Playing this entry releases the key
    pub fn releases(self) -> bool {
        matches!(self, EntryKind::Up | EntryKind::Tap)
    }
}

/// One recorded keystroke
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Entry {
    pub key: KeyCode,
    pub kind: EntryKind,
}

impl Entry {
    pub const fn new(key: KeyCode, kind: EntryKind) -> Self {
        Self { key, kind }
    }

    const EMPTY: Entry = Entry::new(KeyCode::No, EntryKind::Tap);
}

/// The key a slot is bound to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotKey {
    pub key: KeyCode,
    /// Modifiers held when the slot key was picked
    pub modifiers: HidModifiers,
}

impl SlotKey {
    pub fn new(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: HidModifiers::new(),
        }
    }

    pub fn with_modifiers(key: KeyCode, modifiers: HidModifiers) -> Self {
        Self { key, modifiers }
    }
}

/// Reference to a slot: the offset of its header in the arena.
///
/// The first slot always starts at offset 0 and is never removed, so [`SlotId::FIRST`] is always valid.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId(u16);

impl SlotId {
    pub const FIRST: SlotId = SlotId(0);

    pub fn offset(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArenaError {
    /// No slot has enough free space for a header and one entry
    NoSpace,
    /// The slot doesn't exist
    NotFound,
    /// The slot has no room for another entry
    SlotFull,
    /// Another slot is already bound to the key
    KeyInUse,
}

/// Descriptor of a slot
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Slot {
    /// `None` if the slot is unassociated. Unassociated slots never have used entries
    key: Option<SlotKey>,
    start: u16,
    allocated: u16,
    used: u16,
}

impl Slot {
    pub fn id(&self) -> SlotId {
        SlotId(self.start)
    }

    pub fn key(&self) -> Option<SlotKey> {
        self.key
    }

    /// Number of entries this slot can hold
    pub fn allocated(&self) -> usize {
        self.allocated as usize
    }

    /// Number of recorded entries
    pub fn used(&self) -> usize {
        self.used as usize
    }

    pub fn free_space(&self) -> usize {
        (self.allocated - self.used) as usize
    }

    /// Arena units covered by the slot, header included
    pub fn span(&self) -> usize {
        HEADER_SIZE + self.allocated as usize
    }

    // Units a new macro could take from this slot. The header of an unassociated slot is reused
    fn reclaimable(&self) -> usize {
        match self.key {
            Some(_) => self.free_space(),
            None => self.free_space() + HEADER_SIZE,
        }
    }

    fn entries_start(&self) -> usize {
        self.start as usize + HEADER_SIZE
    }
}

/// Storage for all macros. `SIZE` is the total size in entry units.
pub struct MacroArena<const SIZE: usize = MACRO_ARENA_SIZE> {
    /// Slot descriptors, in address order. The predecessor of a slot is the one before it
    slots: Vec<Slot, SIZE>,
    entries: [Entry; SIZE],
}

impl<const SIZE: usize> Default for MacroArena<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> MacroArena<SIZE> {
    /// Create an arena with a single unassociated slot covering all of it
    pub fn new() -> Self {
        const {
            assert!(
                SIZE > HEADER_SIZE && SIZE <= u16::MAX as usize,
                "arena must hold a header and fit u16 offsets"
            )
        };
        let mut slots = Vec::new();
        // Can't fail, the capacity is at least 1
        let _ = slots.push(Slot {
            key: None,
            start: 0,
            allocated: (SIZE - HEADER_SIZE) as u16,
            used: 0,
        });
        Self {
            slots,
            entries: [Entry::EMPTY; SIZE],
        }
    }

    /// Find the slot bound to `key`
    pub fn find_slot(&self, key: SlotKey) -> Option<SlotId> {
        self.slots.iter().find(|s| s.key == Some(key)).map(|s| s.id())
    }

    /// Get the slot descriptor
    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.start == id.0)
    }

    /// All slots, in address order
    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    /// Allocated capacity minus used count of the slot
    pub fn free_space(&self, id: SlotId) -> Option<usize> {
        self.slot(id).map(|s| s.free_space())
    }

    /// Arena units covered by all slots. Always equals `SIZE`
    pub fn covered_size(&self) -> usize {
        self.slots.iter().map(|s| s.span()).sum()
    }

    /// Create a slot for `key`, taking all free space of the slot with the most free space.
    pub fn allocate(&mut self, key: SlotKey) -> Result<SlotId, ArenaError> {
        if self.find_slot(key).is_some() {
            return Err(ArenaError::KeyInUse);
        }

        // The first slot with the largest reclaimable span wins
        let mut winner = 0;
        let mut best = 0;
        for (i, slot) in self.slots.iter().enumerate() {
            let span = slot.reclaimable();
            if span > best {
                winner = i;
                best = span;
            }
        }
        if best < HEADER_SIZE + 1 {
            warn!("No space for a new macro slot, largest free span: {}", best);
            return Err(ArenaError::NoSpace);
        }

        let slot = self.slots[winner];
        if slot.key.is_none() {
            // Take over the whole unassociated slot, its used count is already 0
            self.slots[winner].key = Some(key);
            debug!("Reuse free slot {} with {} entries", slot.start, slot.allocated);
            return Ok(slot.id());
        }

        // Split: the new slot starts right after the winner's used entries
        let new_slot = Slot {
            key: Some(key),
            start: slot.start + (HEADER_SIZE as u16) + slot.used,
            allocated: slot.allocated - slot.used - HEADER_SIZE as u16,
            used: 0,
        };
        if self.slots.insert(winner + 1, new_slot).is_err() {
            error!("Slot table overflowed");
            return Err(ArenaError::NoSpace);
        }
        self.slots[winner].allocated = slot.used;
        debug!(
            "Split slot {}, new slot {} with {} entries",
            slot.start, new_slot.start, new_slot.allocated
        );
        Ok(new_slot.id())
    }

    /// Release a slot and all of its entries.
    ///
    /// The span of the slot is donated to its predecessor. The first slot has no predecessor,
    /// it's cleared in place and stays as an unassociated slot.
    pub fn free(&mut self, id: SlotId) -> Result<(), ArenaError> {
        let index = self
            .slots
            .iter()
            .position(|s| s.start == id.0)
            .ok_or(ArenaError::NotFound)?;

        if index == 0 {
            let slot = &mut self.slots[0];
            slot.key = None;
            slot.used = 0;
            debug!("Cleared first slot, {} entries free", slot.allocated);
        } else {
            let freed = self.slots.remove(index);
            let previous = &mut self.slots[index - 1];
            previous.allocated += HEADER_SIZE as u16 + freed.allocated;
            debug!("Freed slot {}, donated to slot {}", freed.start, previous.start);
        }
        Ok(())
    }

    /// Get the entry at `index` of a slot, `None` if out of the used range
    pub fn entry(&self, id: SlotId, index: usize) -> Option<Entry> {
        let slot = self.slot(id)?;
        if index < slot.used() {
            Some(self.entries[slot.entries_start() + index])
        } else {
            None
        }
    }

    /// All recorded entries of a slot
    pub fn entries(&self, id: SlotId) -> &[Entry] {
        match self.slot(id) {
            Some(slot) => &self.entries[slot.entries_start()..slot.entries_start() + slot.used()],
            None => &[],
        }
    }

    /// The most recently recorded entry of a slot
    pub fn last_entry_mut(&mut self, id: SlotId) -> Option<&mut Entry> {
        let slot = *self.slot(id)?;
        if slot.used == 0 {
            return None;
        }
        Some(&mut self.entries[slot.entries_start() + slot.used() - 1])
    }

    /// Append an entry to a slot
    pub fn push_entry(&mut self, id: SlotId, entry: Entry) -> Result<(), ArenaError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.start == id.0)
            .ok_or(ArenaError::NotFound)?;
        if slot.key.is_none() {
            return Err(ArenaError::NotFound);
        }
        if slot.used == slot.allocated {
            return Err(ArenaError::SlotFull);
        }
        let index = slot.entries_start() + slot.used();
        slot.used += 1;
        self.entries[index] = entry;
        Ok(())
    }
}
