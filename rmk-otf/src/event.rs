use serde::{Deserialize, Serialize};

use crate::keycode::KeyCode;

/// Physical position of a key in the matrix
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyPos {
    pub row: u8,
    pub col: u8,
}

impl KeyPos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// A key state change delivered by the matrix scanner, with the key already resolved by the keymap.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    pub pos: KeyPos,
    pub key: KeyCode,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn key(row: u8, col: u8, key: KeyCode, pressed: bool) -> Self {
        Self {
            pos: KeyPos { row, col },
            key,
            pressed,
        }
    }
}

/// Edge of a key state
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyTransition {
    /// The key became pressed in this cycle
    Pressed,
    /// The key became released in this cycle
    Released,
    /// The key did not change its state
    Steady,
}

/// The event seen by the macro controller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacroEvent {
    pub key: KeyCode,
    /// `None` for events which don't come from a physical key
    pub pos: Option<KeyPos>,
    pub transition: KeyTransition,
    /// The event is synthesized, or arrived while a macro is being played
    pub injected: bool,
}

impl MacroEvent {
    /// An event from a physical key
    pub fn live(key: KeyCode, pos: KeyPos, transition: KeyTransition) -> Self {
        Self {
            key,
            pos: Some(pos),
            transition,
            injected: false,
        }
    }

    /// An event synthesized by macro playback
    pub fn injected(key: KeyCode, transition: KeyTransition) -> Self {
        Self {
            key,
            pos: None,
            transition,
            injected: true,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.transition == KeyTransition::Pressed
    }
}

impl From<KeyEvent> for MacroEvent {
    fn from(event: KeyEvent) -> Self {
        let transition = if event.pressed {
            KeyTransition::Pressed
        } else {
            KeyTransition::Released
        };
        MacroEvent::live(event.key, event.pos, transition)
    }
}
