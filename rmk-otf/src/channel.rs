//! Exposed channels which can be used to share data with the rest of the firmware

use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
pub use embassy_sync::{blocking_mutex, channel, signal};

use crate::event::KeyEvent;
use crate::hid::Report;
use crate::host::Flash;
use crate::{KEY_EVENT_CHANNEL_SIZE, REPORT_CHANNEL_SIZE, RawMutex};

/// Channel for key events, from the matrix scanner to the macro runner
pub static KEY_EVENT_CHANNEL: Channel<RawMutex, KeyEvent, KEY_EVENT_CHANNEL_SIZE> = Channel::new();
/// Channel for keyboard report from the macro runner to hid writer
pub static KEYBOARD_REPORT_CHANNEL: Channel<RawMutex, Report, REPORT_CHANNEL_SIZE> = Channel::new();
/// Signal for the LED driver, only the latest flash request is kept
pub static FLASH_SIGNAL: Signal<RawMutex, Flash> = Signal::new();
