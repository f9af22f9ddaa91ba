use serde::{Deserialize, Serialize};
use strum::FromRepr;

use crate::hid_state::HidModifiers;

/// Key codes which can be recorded into a macro.
///
/// Values below 0x100 follow the HID keyboard page. The two macro trigger keys live outside the
/// HID range and are never put into a report.
#[repr(u16)]
#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyCode {
    /// Reserved, no-key.
    No = 0x0000,
    A = 0x0004,
    B = 0x0005,
    C = 0x0006,
    D = 0x0007,
    E = 0x0008,
    F = 0x0009,
    G = 0x000A,
    H = 0x000B,
    I = 0x000C,
    J = 0x000D,
    K = 0x000E,
    L = 0x000F,
    M = 0x0010,
    N = 0x0011,
    O = 0x0012,
    P = 0x0013,
    Q = 0x0014,
    R = 0x0015,
    S = 0x0016,
    T = 0x0017,
    U = 0x0018,
    V = 0x0019,
    W = 0x001A,
    X = 0x001B,
    Y = 0x001C,
    Z = 0x001D,
    Kc1 = 0x001E,
    Kc2 = 0x001F,
    Kc3 = 0x0020,
    Kc4 = 0x0021,
    Kc5 = 0x0022,
    Kc6 = 0x0023,
    Kc7 = 0x0024,
    Kc8 = 0x0025,
    Kc9 = 0x0026,
    Kc0 = 0x0027,
    Enter = 0x0028,
    Escape = 0x0029,
    Backspace = 0x002A,
    Tab = 0x002B,
    Space = 0x002C,
    Minus = 0x002D,
    Equal = 0x002E,
    LeftBracket = 0x002F,
    RightBracket = 0x0030,
    Backslash = 0x0031,
    Semicolon = 0x0033,
    Quote = 0x0034,
    Grave = 0x0035,
    Comma = 0x0036,
    Dot = 0x0037,
    Slash = 0x0038,
    CapsLock = 0x0039,
    F1 = 0x003A,
    F2 = 0x003B,
    F3 = 0x003C,
    F4 = 0x003D,
    F5 = 0x003E,
    F6 = 0x003F,
    F7 = 0x0040,
    F8 = 0x0041,
    F9 = 0x0042,
    F10 = 0x0043,
    F11 = 0x0044,
    F12 = 0x0045,
    Insert = 0x0049,
    Home = 0x004A,
    PageUp = 0x004B,
    Delete = 0x004C,
    End = 0x004D,
    PageDown = 0x004E,
    Right = 0x004F,
    Left = 0x0050,
    Down = 0x0051,
    Up = 0x0052,
    /// Left Control
    LCtrl = 0x00E0,
    /// Left Shift
    LShift = 0x00E1,
    /// Left Alt
    LAlt = 0x00E2,
    /// Left GUI
    LGui = 0x00E3,
    /// Right Control
    RCtrl = 0x00E4,
    /// Right Shift
    RShift = 0x00E5,
    /// Right Alt
    RAlt = 0x00E6,
    /// Right GUI
    RGui = 0x00E7,
    /// Start picking a slot to record into, or stop the current recording
    MacroRecord = 0x0540,
    /// Start picking a slot to play
    MacroPlay = 0x0541,
}

impl KeyCode {
    /// All modifier keycodes, in HID bit order
    pub const MODIFIERS: [KeyCode; 8] = [
        KeyCode::LCtrl,
        KeyCode::LShift,
        KeyCode::LAlt,
        KeyCode::LGui,
        KeyCode::RCtrl,
        KeyCode::RShift,
        KeyCode::RAlt,
        KeyCode::RGui,
    ];

    /// Returns `true` if the keycode is a modifier keycode
    pub fn is_modifier(self) -> bool {
        KeyCode::LCtrl <= self && self <= KeyCode::RGui
    }

    /// Returns `true` if the keycode is a non-modifier key that goes into the keycode array of a report
    pub fn is_basic(self) -> bool {
        KeyCode::A <= self && self <= KeyCode::Up
    }

    /// Returns `true` if the keycode is one of the macro trigger keys
    pub fn is_macro_trigger(self) -> bool {
        self == KeyCode::MacroRecord || self == KeyCode::MacroPlay
    }

    /// Returns the byte with the bit corresponding to the USB HID
    /// modifier bitfield set.
    pub fn to_hid_modifiers(self) -> HidModifiers {
        match self {
            KeyCode::LCtrl => HidModifiers::new().with_left_ctrl(true),
            KeyCode::LShift => HidModifiers::new().with_left_shift(true),
            KeyCode::LAlt => HidModifiers::new().with_left_alt(true),
            KeyCode::LGui => HidModifiers::new().with_left_gui(true),
            KeyCode::RCtrl => HidModifiers::new().with_right_ctrl(true),
            KeyCode::RShift => HidModifiers::new().with_right_shift(true),
            KeyCode::RAlt => HidModifiers::new().with_right_alt(true),
            KeyCode::RGui => HidModifiers::new().with_right_gui(true),
            _ => HidModifiers::new(),
        }
    }

    /// The usage id of the key in the HID keyboard page, `0` for keys outside of it
    pub fn as_hid_u8(self) -> u8 {
        if (self as u16) <= 0xFF { self as u16 as u8 } else { 0 }
    }
}

impl From<u16> for KeyCode {
    fn from(value: u16) -> Self {
        Self::from_repr(value).unwrap_or(KeyCode::No)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_classes() {
        assert!(KeyCode::LShift.is_modifier());
        assert!(KeyCode::RGui.is_modifier());
        assert!(!KeyCode::Z.is_modifier());
        assert!(KeyCode::A.is_basic());
        assert!(KeyCode::Up.is_basic());
        assert!(!KeyCode::LCtrl.is_basic());
        assert!(!KeyCode::MacroPlay.is_basic());
        assert!(KeyCode::MacroRecord.is_macro_trigger());
        assert!(!KeyCode::No.is_macro_trigger());
    }

    #[test]
    fn test_hid_conversion() {
        assert_eq!(KeyCode::A.as_hid_u8(), 0x04);
        assert_eq!(KeyCode::RGui.as_hid_u8(), 0xE7);
        assert_eq!(KeyCode::MacroPlay.as_hid_u8(), 0);
        assert_eq!(KeyCode::from(0x001B), KeyCode::X);
        assert_eq!(KeyCode::from(0x0032), KeyCode::No);
        assert_eq!(
            KeyCode::RShift.to_hid_modifiers(),
            HidModifiers::new().with_right_shift(true)
        );
        assert_eq!(KeyCode::Space.to_hid_modifiers(), HidModifiers::new());
    }
}
