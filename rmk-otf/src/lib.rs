//! # RMK On-The-Fly Macros
//!
//! Record a sequence of keystrokes at runtime and bind it to whichever key is pressed next,
//! then replay it later with the play key followed by the same key.
//!
//! Press [`KeyCode::MacroRecord`], press the slot key, type the macro, press
//! [`KeyCode::MacroRecord`] again to finish. Press [`KeyCode::MacroPlay`] followed by the
//! slot key to replay. [`KeyCode::MacroPlay`] twice replays the last played macro.
//!
//! All macros share one fixed-size [`arena::MacroArena`], nothing is persisted across a reset.
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
pub use keycode::KeyCode;

pub mod arena;
pub mod channel;
pub mod config;
pub mod controller;
pub mod event;
pub mod held_buffer;
pub mod hid;
pub mod hid_state;
pub mod host;
pub mod keycode;
pub mod player;
pub mod recorder;
pub mod runner;

/// Mutex type used by the channels
pub type RawMutex = CriticalSectionRawMutex;

/// Default arena size, in entry units. A slot header costs [`arena::HEADER_SIZE`] units
pub const MACRO_ARENA_SIZE: usize = 150;
/// Max number of keys tracked as held during playback
pub const HELD_KEYS_SIZE: usize = 16;
/// Max number of macros playing at once, caps [`config::OnTheFlyConfig::max_play_depth`]
pub const PLAY_STACK_SIZE: usize = 8;
/// Max number of reports waiting to be sent
pub const PENDING_REPORTS_SIZE: usize = 4;
/// Max number of physical keys masked at the same time
pub const MASKED_KEYS_SIZE: usize = 8;
/// Capacity of the key event channel
pub const KEY_EVENT_CHANNEL_SIZE: usize = 16;
/// Capacity of the keyboard report channel
pub const REPORT_CHANNEL_SIZE: usize = 16;
