use crate::HELD_KEYS_SIZE;
use crate::keycode::KeyCode;

/// The buffer of keys held down by a playing macro, in press order.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeldBuffer<const N: usize = HELD_KEYS_SIZE> {
    keys: heapless::Vec<KeyCode, N>,
}

impl<const N: usize> HeldBuffer<N> {
    /// Create a new held buffer
    pub fn new() -> Self {
        Self {
            keys: heapless::Vec::new(),
        }
    }

    /// Push a pressed key into the buffer.
    ///
    /// A key which is already in the buffer isn't added twice. If the buffer is full the key is
    /// dropped from bookkeeping, it won't be re-asserted after the next release.
    pub fn push(&mut self, key: KeyCode) {
        if self.keys.contains(&key) {
            return;
        }
        if let Err(k) = self.keys.push(key) {
            warn!("Held buffer overflowed, cannot save: {:?}", k);
        }
    }

    /// Remove a released key from the buffer, keep the order
    pub fn remove(&mut self, key: KeyCode) -> Option<KeyCode> {
        let i = self.keys.iter().position(|&k| k == key)?;
        Some(self.keys.remove(i))
    }

    pub fn as_slice(&self) -> &[KeyCode] {
        &self.keys
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_push_and_remove_keep_order() {
        let mut held: HeldBuffer<4> = HeldBuffer::new();
        held.push(KeyCode::A);
        held.push(KeyCode::B);
        held.push(KeyCode::C);
        held.push(KeyCode::B);
        assert_eq!(held.as_slice(), &[KeyCode::A, KeyCode::B, KeyCode::C]);

        assert_eq!(held.remove(KeyCode::B), Some(KeyCode::B));
        assert_eq!(held.as_slice(), &[KeyCode::A, KeyCode::C]);
        assert_eq!(held.remove(KeyCode::Z), None);
    }

    #[test]
    fn test_overflow_drops_key() {
        let mut held: HeldBuffer<2> = HeldBuffer::new();
        held.push(KeyCode::A);
        held.push(KeyCode::B);
        held.push(KeyCode::C);
        assert_eq!(held.as_slice(), &[KeyCode::A, KeyCode::B]);
        // Releasing a dropped key is a no-op
        assert_eq!(held.remove(KeyCode::C), None);
    }
}
