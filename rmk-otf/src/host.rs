//! Interfaces to the rest of the firmware.
//!
//! The macro controller only decides what should happen. Flashing LEDs, suppressing keys,
//! and sending reports to the host are done by whoever implements these traits.

use heapless::Vec;

use crate::config::Rgb;
use crate::event::{KeyPos, KeyTransition};
use crate::keycode::KeyCode;

/// A flash request for the LED driver
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flash {
    /// Flash the whole keyboard
    All(Rgb),
    /// Flash single keys, at most two at once
    Keys(Vec<(KeyPos, Rgb), 2>),
}

/// Visual feedback of the macro state
pub trait Feedback {
    /// Flash a single key
    fn flash_one(&mut self, pos: KeyPos, color: Rgb);

    /// Flash the whole keyboard
    fn flash_all(&mut self, color: Rgb);

    /// Flash a second key right after `flash_one`, together with the first one
    fn flash_second(&mut self, pos: KeyPos, color: Rgb);
}

/// Suppression of physical keys
pub trait KeyMasker {
    /// Ignore all further transitions of the key at `pos`, until it's released
    fn mask_until_release(&mut self, pos: KeyPos);
}

/// The outgoing side of the keyboard, which turns key events into HID reports
pub trait EventSink {
    /// Apply a key event to the pending report.
    ///
    /// `KeyTransition::Steady` marks a key as held without treating it as a fresh press.
    fn submit(&mut self, key: KeyCode, transition: KeyTransition);

    /// Release every key of the pending report
    fn release_all(&mut self);

    /// Send the pending report
    fn flush_report(&mut self);
}

/// Query of the current modifier state
pub trait ModifierQuery {
    /// Whether the modifier `key` was held in the last sent report
    fn was_modifier_active(&self, key: KeyCode) -> bool;
}

/// Everything the macro controller needs from the firmware
pub trait MacroHost: Feedback + KeyMasker + EventSink + ModifierQuery {}

impl<T: Feedback + KeyMasker + EventSink + ModifierQuery> MacroHost for T {}
