//! Versioned ciphertext envelopes for text secrets
//!
//! Two binary layouts are in circulation:
//!
//! - legacy: `nonce(12) || ciphertext+tag`
//! - versioned: `version(1) || nonce(12) || ciphertext+tag`, where version
//!   is 1 for a 16-byte key and 2 for a 32-byte key
//!
//! The layouts are told apart by the first byte only (see [`detect_format`]).
//! This is ambiguous: a legacy envelope whose random nonce happens to start
//! with 0x01 or 0x02 is read as versioned and then fails to authenticate.
//! About 1 in 128 legacy envelopes are affected. The heuristic is kept as-is
//! because existing links depend on it.
//!
//! The envelope is base-64 encoded for transport. The key travels separately,
//! as base-58 text in the fragment of a share link.

use tracing::debug;

use crate::armor;
use crate::cipher::{AeadCipher, AesGcm, NONCE_LEN};
use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::key::{KeyStrength, SecretKey};
use crate::random::{OsRandom, RandomSource};

/// Version byte for envelopes sealed with a 16-byte key.
pub const VERSION_AES128: u8 = 1;

/// Version byte for envelopes sealed with a 32-byte key.
pub const VERSION_AES256: u8 = 2;

/// Binary layout of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeFormat {
    /// No version byte; the envelope starts with the nonce.
    Legacy,
    /// Version byte 1, AES-128-GCM.
    V1,
    /// Version byte 2, AES-256-GCM.
    V2,
}

impl EnvelopeFormat {
    /// The versioned layout that matches a key's strength.
    pub fn for_key(strength: KeyStrength) -> Self {
        match strength {
            KeyStrength::Aes128 => EnvelopeFormat::V1,
            KeyStrength::Aes256 => EnvelopeFormat::V2,
        }
    }

    pub fn version_byte(self) -> Option<u8> {
        match self {
            EnvelopeFormat::Legacy => None,
            EnvelopeFormat::V1 => Some(VERSION_AES128),
            EnvelopeFormat::V2 => Some(VERSION_AES256),
        }
    }

    fn header_len(self) -> usize {
        match self {
            EnvelopeFormat::Legacy => 0,
            EnvelopeFormat::V1 | EnvelopeFormat::V2 => 1,
        }
    }
}

/// Decides the layout of a raw envelope from its first byte.
///
/// 1 and 2 mean versioned; anything else, including an empty input, means
/// legacy. There is deliberately no attempt to second-guess a legacy nonce
/// that starts with 1 or 2.
pub fn detect_format(bytes: &[u8]) -> EnvelopeFormat {
    match bytes.first() {
        Some(&VERSION_AES128) => EnvelopeFormat::V1,
        Some(&VERSION_AES256) => EnvelopeFormat::V2,
        _ => EnvelopeFormat::Legacy,
    }
}

/// A raw envelope split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEnvelope<'a> {
    pub format: EnvelopeFormat,
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: &'a [u8],
}

/// Splits a raw envelope according to [`detect_format`].
pub fn parse(bytes: &[u8]) -> Result<ParsedEnvelope<'_>> {
    let format = detect_format(bytes);
    let body = &bytes[format.header_len().min(bytes.len())..];

    if body.len() < NONCE_LEN {
        return Err(SealnoteError::with_kind(
            ErrorCategory::User,
            ErrorKind::MalformedEnvelope,
            format!(
                "envelope likely truncated: {} bytes left for a {}-byte nonce",
                body.len(),
                NONCE_LEN
            ),
        ));
    }
    let (nonce, ciphertext) = body.split_at(NONCE_LEN);
    let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| {
        SealnoteError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "nonce slice has unexpected length",
        )
    })?;

    Ok(ParsedEnvelope {
        format,
        nonce,
        ciphertext,
    })
}

/// Lays out an envelope in the given format.
pub fn assemble(format: EnvelopeFormat, nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(format.header_len() + NONCE_LEN + ciphertext.len());
    if let Some(version) = format.version_byte() {
        out.push(version);
    }
    out.extend_from_slice(nonce);
    out.extend_from_slice(ciphertext);
    out
}

/// Seals `plaintext` into a raw envelope with explicit collaborators.
///
/// `format` is normally `EnvelopeFormat::for_key(key.strength())`; legacy
/// output exists only so older readers can still be served.
pub fn seal_with(
    random: &mut dyn RandomSource,
    cipher: &dyn AeadCipher,
    key: &SecretKey,
    plaintext: &[u8],
    format: EnvelopeFormat,
) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    random.fill(&mut nonce)?;

    let ciphertext = cipher.encrypt(key, &nonce, plaintext)?;
    let envelope = assemble(format, &nonce, &ciphertext);
    debug!(
        ?format,
        plaintext_len = plaintext.len(),
        envelope_len = envelope.len(),
        "sealed envelope"
    );
    Ok(envelope)
}

/// Opens a raw envelope with explicit collaborators.
///
/// The cipher profile comes from the key length, not from the version byte.
/// A mismatched pair is not rejected up front; it simply fails to
/// authenticate.
pub fn open_with(cipher: &dyn AeadCipher, key: &SecretKey, envelope: &[u8]) -> Result<Vec<u8>> {
    let parsed = parse(envelope)?;
    debug!(
        format = ?parsed.format,
        key_strength = ?key.strength(),
        ciphertext_len = parsed.ciphertext.len(),
        "opening envelope"
    );
    cipher.decrypt(key, &parsed.nonce, parsed.ciphertext)
}

/// Seals bytes under base-58 `key_text`, returning the base-64 envelope.
pub fn seal(plaintext: &[u8], key_text: &str) -> Result<String> {
    let key = SecretKey::from_text(key_text)?;
    let format = EnvelopeFormat::for_key(key.strength());
    let envelope = seal_with(&mut OsRandom, &AesGcm, &key, plaintext, format)?;
    Ok(armor::wrap(&envelope))
}

/// Opens a base-64 envelope with base-58 `key_text`.
pub fn open(envelope: &str, key_text: &str) -> Result<Vec<u8>> {
    let key = SecretKey::from_text(key_text)?;
    let raw = armor::unwrap(envelope)?;
    open_with(&AesGcm, &key, &raw)
}

/// Seals a text secret.
pub fn seal_text(plaintext: &str, key_text: &str) -> Result<String> {
    seal(plaintext.as_bytes(), key_text)
}

/// Opens a text secret.
///
/// A plaintext that authenticates but is not UTF-8 was not produced by
/// [`seal_text`] and is reported as [`ErrorKind::MalformedEnvelope`].
pub fn open_text(envelope: &str, key_text: &str) -> Result<String> {
    let plaintext = open(envelope, key_text)?;
    String::from_utf8(plaintext).map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedEnvelope,
            "decrypted secret is not valid UTF-8",
            e,
        )
    })
}
