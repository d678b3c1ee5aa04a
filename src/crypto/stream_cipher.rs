//! RC4 keystream cipher.
//!
//! The gateway encrypts envelope payloads with RC4, so this is a fixed
//! external contract rather than a choice: output must match the reference
//! algorithm byte for byte.

use super::SessionKey;

/// RC4 state after key scheduling. Each call to [`Rc4::next_byte`] advances
/// the keystream by one byte.
#[derive(Clone)]
pub struct Rc4 {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Runs the key-scheduling algorithm.
    ///
    /// # Panics
    ///
    /// Panics if `key` is empty. Keys longer than 256 bytes only use their
    /// first 256 bytes.
    pub fn new(key: &[u8]) -> Self {
        assert!(!key.is_empty(), "RC4 key must not be empty");

        let mut state = [0u8; 256];
        for (slot, value) in state.iter_mut().zip(0u8..=255) {
            *slot = value;
        }

        let mut j: u8 = 0;
        for i in 0..256 {
            j = j
                .wrapping_add(state[i])
                .wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }

        Self { state, i: 0, j: 0 }
    }

    pub fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.state[self.i as usize]);
        self.state.swap(self.i as usize, self.j as usize);
        let index = self.state[self.i as usize].wrapping_add(self.state[self.j as usize]);
        self.state[index as usize]
    }

    /// XORs the keystream into `buf` in place.
    pub fn apply_keystream(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte ^= self.next_byte();
        }
    }
}

impl Iterator for Rc4 {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        Some(self.next_byte())
    }
}

/// Infinite keystream for `key`.
pub fn keystream(key: &SessionKey) -> impl Iterator<Item = u8> {
    Rc4::new(key.as_bytes())
}

/// Encrypts or decrypts `input`; the operation is its own inverse.
pub fn transform(key: &SessionKey, input: &[u8]) -> Vec<u8> {
    let mut output = input.to_vec();
    Rc4::new(key.as_bytes()).apply_keystream(&mut output);
    output
}
