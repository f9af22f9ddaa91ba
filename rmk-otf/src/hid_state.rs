use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use bitfield_struct::bitfield;

use crate::keycode::KeyCode;

/// Modifier bits of a keyboard report, in USB HID order.
///
/// Also part of a slot key, so that a slot picked with `Shift` held differs from the plain one.
#[bitfield(u8, order = Lsb, defmt = cfg(feature = "defmt"))]
#[derive(Eq, PartialEq, Hash)]
pub struct HidModifiers {
    #[bits(1)]
    pub left_ctrl: bool,
    #[bits(1)]
    pub left_shift: bool,
    #[bits(1)]
    pub left_alt: bool,
    #[bits(1)]
    pub left_gui: bool,
    #[bits(1)]
    pub right_ctrl: bool,
    #[bits(1)]
    pub right_shift: bool,
    #[bits(1)]
    pub right_alt: bool,
    #[bits(1)]
    pub right_gui: bool,
}

macro_rules! impl_bit_op {
    ($op:ident, $method:ident, $assign_op:ident, $assign_method:ident, $tok:tt) => {
        impl $op for HidModifiers {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                Self::from_bits(self.into_bits() $tok rhs.into_bits())
            }
        }

        impl $assign_op for HidModifiers {
            fn $assign_method(&mut self, rhs: Self) {
                *self = *self $tok rhs;
            }
        }
    };
}

impl_bit_op!(BitOr, bitor, BitOrAssign, bitor_assign, |);
impl_bit_op!(BitAnd, bitand, BitAndAssign, bitand_assign, &);

impl Not for HidModifiers {
    type Output = Self;

    fn not(self) -> Self {
        Self::from_bits(!self.into_bits())
    }
}

impl HidModifiers {
    pub fn is_empty(self) -> bool {
        self.into_bits() == 0
    }

    /// Whether the bit of modifier `key` is set. Always `false` for non-modifier keys
    pub fn contains_key(self, key: KeyCode) -> bool {
        !(self & key.to_hid_modifiers()).is_empty()
    }
}

impl FromIterator<KeyCode> for HidModifiers {
    fn from_iter<I: IntoIterator<Item = KeyCode>>(iter: I) -> Self {
        iter.into_iter()
            .fold(HidModifiers::new(), |acc, key| acc | key.to_hid_modifiers())
    }
}
