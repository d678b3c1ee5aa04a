//! Hybrid encryption used by the gateway: an RC4 session key for the payload,
//! wrapped with RSA for transport.

pub mod envelope;
pub mod key_wrap;
pub mod stream_cipher;

use crate::error::PaymentError;
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;

pub const SESSION_KEY_LEN: usize = 16;

/// One-time symmetric key for a single envelope.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    /// Draws a fresh key from the operating system's CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for SessionKey {
    type Error = PaymentError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; SESSION_KEY_LEN] = bytes.try_into().map_err(|_| PaymentError::Decryption)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}
