//! Symmetric key material
//!
//! A key is 16 or 32 random bytes. Its only external form is base-58 text,
//! which ends up after the `#` of a share link and is never sent to a server.
//! The strength is never stored separately: it is whatever the decoded
//! length says it is.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::base58;
use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::random::{OsRandom, RandomSource};

/// Supported key sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrength {
    /// 16-byte key, AES-128-GCM. Used by legacy and version 1 envelopes.
    Aes128,
    /// 32-byte key, AES-256-GCM. Used by version 2 envelopes.
    #[default]
    Aes256,
}

impl KeyStrength {
    /// Raw key length in bytes.
    pub const fn len(self) -> usize {
        match self {
            KeyStrength::Aes128 => 16,
            KeyStrength::Aes256 => 32,
        }
    }

    /// Maps a decoded key length back to a strength.
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(KeyStrength::Aes128),
            32 => Some(KeyStrength::Aes256),
            _ => None,
        }
    }
}

/// Raw key bytes, wiped from memory on drop.
#[derive(Clone)]
pub struct SecretKey {
    bytes: Zeroizing<Vec<u8>>,
    strength: KeyStrength,
}

impl SecretKey {
    /// Draws a fresh key of the given strength from `random`.
    pub fn generate_with(random: &mut dyn RandomSource, strength: KeyStrength) -> Result<Self> {
        let mut bytes = Zeroizing::new(vec![0u8; strength.len()]);
        random.fill(&mut bytes)?;
        Ok(Self { bytes, strength })
    }

    /// Wraps raw bytes, rejecting anything but 16 or 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let strength = KeyStrength::from_len(bytes.len()).ok_or_else(|| {
            SealnoteError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidKey,
                format!("key must be 16 or 32 bytes, got {}", bytes.len()),
            )
        })?;
        Ok(Self {
            bytes: Zeroizing::new(bytes.to_vec()),
            strength,
        })
    }

    /// Parses base-58 key text.
    ///
    /// Both a bad character and a bad decoded length are reported as
    /// [`ErrorKind::InvalidKey`]. Whitespace is a bad character; trimming is
    /// up to whoever read the text (see [`crate::key_source`]).
    pub fn from_text(text: &str) -> Result<Self> {
        let bytes = Zeroizing::new(base58::decode(text).map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidKey,
                "key is not valid base-58",
                e,
            )
        })?);
        Self::from_bytes(&bytes)
    }

    /// The base-58 form of the key.
    pub fn to_text(&self) -> Zeroizing<String> {
        Zeroizing::new(base58::encode(&self.bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn strength(&self) -> KeyStrength {
        self.strength
    }
}

/// Constant time in the key bytes; only the length may leak.
impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.as_slice().ct_eq(other.bytes.as_slice()).into()
    }
}

impl Eq for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("strength", &self.strength)
            .finish_non_exhaustive()
    }
}

/// Generates a new 32-byte key from the OS random source and returns its text form.
pub fn generate() -> Result<Zeroizing<String>> {
    let key = SecretKey::generate_with(&mut OsRandom, KeyStrength::default())?;
    Ok(key.to_text())
}
