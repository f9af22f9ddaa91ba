//! HID reports, and the host adapter which produces them.

use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::{Deque, Vec};
use serde::Serialize;

use crate::config::Rgb;
use crate::event::{KeyPos, KeyTransition};
use crate::hid_state::HidModifiers;
use crate::host::{EventSink, Feedback, Flash, KeyMasker, ModifierQuery};
use crate::keycode::KeyCode;
use crate::{MASKED_KEYS_SIZE, PENDING_REPORTS_SIZE, REPORT_CHANNEL_SIZE, RawMutex};

/// Boot keyboard report
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    pub modifier: u8, // HidModifiers
    pub reserved: u8,
    pub leds: u8,
    pub keycodes: [u8; 6],
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Report {
    /// Normal keyboard hid report
    KeyboardReport(KeyboardReport),
}

/// Keyboard state seen by the host computer, fed by passed-through and synthesized key events.
///
/// Flushed reports are queued, [`HidHost::send_reports`] moves them to a channel which is read by
/// the USB or BLE writer task. Flash requests go to a signal, which is read by the LED driver.
pub struct HidHost<'a, const N: usize = REPORT_CHANNEL_SIZE> {
    report_channel: &'a Channel<RawMutex, Report, N>,
    flash_signal: &'a Signal<RawMutex, Flash>,
    held_modifiers: HidModifiers,
    held_keycodes: [KeyCode; 6],
    /// Modifiers in the last report sent
    sent_modifiers: HidModifiers,
    /// Flushed reports, not in the channel yet
    pending: Deque<Report, PENDING_REPORTS_SIZE>,
    /// Physical keys whose transitions are ignored until they're released
    masked: Vec<KeyPos, MASKED_KEYS_SIZE>,
    /// Keys of the last key flash, `flash_second` adds to it
    flashed_keys: Vec<(KeyPos, Rgb), 2>,
}

impl<'a, const N: usize> HidHost<'a, N> {
    pub fn new(report_channel: &'a Channel<RawMutex, Report, N>, flash_signal: &'a Signal<RawMutex, Flash>) -> Self {
        Self {
            report_channel,
            flash_signal,
            held_modifiers: HidModifiers::new(),
            held_keycodes: [KeyCode::No; 6],
            sent_modifiers: HidModifiers::new(),
            pending: Deque::new(),
            masked: Vec::new(),
            flashed_keys: Vec::new(),
        }
    }

    pub fn is_masked(&self, pos: KeyPos) -> bool {
        self.masked.contains(&pos)
    }

    pub fn unmask(&mut self, pos: KeyPos) {
        self.masked.retain(|&p| p != pos);
    }

    /// The report which would be sent now
    pub fn report(&self) -> KeyboardReport {
        KeyboardReport {
            modifier: self.held_modifiers.into_bits(),
            reserved: 0,
            leds: 0,
            keycodes: self.held_keycodes.map(|k| k.as_hid_u8()),
        }
    }

    /// Send all flushed reports, wait until the channel has room for each of them
    pub async fn send_reports(&mut self) {
        while let Some(report) = self.pending.pop_front() {
            self.report_channel.send(report).await;
        }
    }

    /// Register a key, the key can be a basic keycode or a modifier.
    fn register_key(&mut self, key: KeyCode) {
        if key.is_modifier() {
            self.held_modifiers |= key.to_hid_modifiers();
        } else if key.is_basic() {
            self.register_keycode(key);
        }
    }

    /// Unregister a key, the key can be a basic keycode or a modifier.
    fn unregister_key(&mut self, key: KeyCode) {
        if key.is_modifier() {
            self.held_modifiers &= !key.to_hid_modifiers();
        } else if key.is_basic() {
            self.unregister_keycode(key);
        }
    }

    /// Register a key to be sent in hid report.
    fn register_keycode(&mut self, key: KeyCode) {
        if self.held_keycodes.contains(&key) {
            return;
        }
        // Find the first free slot
        if let Some(index) = self.held_keycodes.iter().position(|&k| k == KeyCode::No) {
            self.held_keycodes[index] = key;
        } else {
            warn!("No free slot in the report for {:?}", key);
        }
    }

    /// Unregister a key from hid report.
    fn unregister_keycode(&mut self, key: KeyCode) {
        if let Some(index) = self.held_keycodes.iter().position(|&k| k == key) {
            self.held_keycodes[index] = KeyCode::No;
        }
    }

    fn send_flash(&self, flash: Flash) {
        self.flash_signal.signal(flash);
    }
}

impl<const N: usize> EventSink for HidHost<'_, N> {
    fn submit(&mut self, key: KeyCode, transition: KeyTransition) {
        match transition {
            KeyTransition::Pressed | KeyTransition::Steady => self.register_key(key),
            KeyTransition::Released => self.unregister_key(key),
        }
    }

    fn release_all(&mut self) {
        self.held_modifiers = HidModifiers::new();
        self.held_keycodes = [KeyCode::No; 6];
    }

    fn flush_report(&mut self) {
        let report = self.report();
        trace!("Sending keyboard report: {:?}", report);
        if self.pending.push_back(Report::KeyboardReport(report)).is_err() {
            error!("Too many pending reports, report dropped");
        }
        self.sent_modifiers = self.held_modifiers;
    }
}

impl<const N: usize> ModifierQuery for HidHost<'_, N> {
    fn was_modifier_active(&self, key: KeyCode) -> bool {
        self.sent_modifiers.contains_key(key)
    }
}

impl<const N: usize> KeyMasker for HidHost<'_, N> {
    fn mask_until_release(&mut self, pos: KeyPos) {
        if self.is_masked(pos) {
            return;
        }
        if self.masked.push(pos).is_err() {
            warn!("Too many masked keys, cannot mask {:?}", pos);
        }
    }
}

impl<const N: usize> Feedback for HidHost<'_, N> {
    fn flash_one(&mut self, pos: KeyPos, color: Rgb) {
        self.flashed_keys.clear();
        // Can't fail, the keys were just cleared
        let _ = self.flashed_keys.push((pos, color));
        self.send_flash(Flash::Keys(self.flashed_keys.clone()));
    }

    fn flash_all(&mut self, color: Rgb) {
        self.flashed_keys.clear();
        self.send_flash(Flash::All(color));
    }

    fn flash_second(&mut self, pos: KeyPos, color: Rgb) {
        if self.flashed_keys.len() == self.flashed_keys.capacity() {
            self.flashed_keys.pop();
        }
        // Can't fail, there's room for one key at least
        let _ = self.flashed_keys.push((pos, color));
        self.send_flash(Flash::Keys(self.flashed_keys.clone()));
    }
}
