//! AEAD primitive behind the envelope codec
//!
//! Both profiles use a 96-bit nonce, a 128-bit tag appended to the
//! ciphertext, and no associated data. The profile is picked from the key
//! length alone.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};

use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::key::{KeyStrength, SecretKey};

/// Length of the nonce (IV) in bytes.
pub const NONCE_LEN: usize = 12;

/// Length of the authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Authenticated encryption with a caller-provided nonce.
pub trait AeadCipher {
    /// Encrypts `plaintext`, returning ciphertext with the tag appended.
    fn encrypt(&self, key: &SecretKey, nonce: &[u8; NONCE_LEN], plaintext: &[u8])
    -> Result<Vec<u8>>;

    /// Verifies and decrypts `ciphertext` (tag included).
    ///
    /// Any verification failure is [`ErrorKind::AuthenticationFailed`].
    fn decrypt(
        &self,
        key: &SecretKey,
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;
}

/// AES-GCM, 128 or 256 bit depending on the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcm;

impl AeadCipher for AesGcm {
    fn encrypt(
        &self,
        key: &SecretKey,
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);
        let sealed = match key.strength() {
            KeyStrength::Aes128 => init::<Aes128Gcm>(key)?.encrypt(nonce, plaintext),
            KeyStrength::Aes256 => init::<Aes256Gcm>(key)?.encrypt(nonce, plaintext),
        };
        sealed.map_err(|_| {
            SealnoteError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "encryption failed",
            )
        })
    }

    fn decrypt(
        &self,
        key: &SecretKey,
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);
        let opened = match key.strength() {
            KeyStrength::Aes128 => init::<Aes128Gcm>(key)?.decrypt(nonce, ciphertext),
            KeyStrength::Aes256 => init::<Aes256Gcm>(key)?.decrypt(nonce, ciphertext),
        };
        opened.map_err(|_| {
            SealnoteError::with_kind(
                ErrorCategory::User,
                ErrorKind::AuthenticationFailed,
                "corrupt input, tampered-with data, or wrong key",
            )
        })
    }
}

fn init<C: KeyInit>(key: &SecretKey) -> Result<C> {
    C::new_from_slice(key.as_bytes()).map_err(|_| {
        SealnoteError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "key length does not match cipher profile",
        )
    })
}
