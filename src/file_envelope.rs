//! Sealing files
//!
//! Files use the same AEAD scheme as text secrets but a different container:
//! there is no version byte, and the nonce and ciphertext are separate
//! base-64 fields. The nonce sits in a metadata record next to the original
//! filename and content type; the ciphertext is uploaded as its own blob.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::armor;
use crate::cipher::{AeadCipher, AesGcm, NONCE_LEN};
use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::key::SecretKey;
use crate::random::{OsRandom, RandomSource};

/// Content type used when the caller does not know better.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Plaintext description of a sealed file, stored next to its ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub original_filename: String,
    pub content_type: String,
    /// Base-64 nonce.
    pub iv: String,
}

/// A sealed file: metadata plus the base-64 ciphertext blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedFile {
    pub metadata: FileMetadata,
    pub ciphertext: String,
}

pub fn seal_file_with(
    random: &mut dyn RandomSource,
    cipher: &dyn AeadCipher,
    key: &SecretKey,
    contents: &[u8],
    original_filename: &str,
    content_type: &str,
) -> Result<SealedFile> {
    let mut nonce = [0u8; NONCE_LEN];
    random.fill(&mut nonce)?;
    let ciphertext = cipher.encrypt(key, &nonce, contents)?;
    debug!(
        contents_len = contents.len(),
        ciphertext_len = ciphertext.len(),
        content_type,
        "sealed file"
    );

    Ok(SealedFile {
        metadata: FileMetadata {
            original_filename: original_filename.to_owned(),
            content_type: content_type.to_owned(),
            iv: armor::wrap(&nonce),
        },
        ciphertext: armor::wrap(&ciphertext),
    })
}

pub fn open_file_with(
    cipher: &dyn AeadCipher,
    key: &SecretKey,
    metadata: &FileMetadata,
    ciphertext: &str,
) -> Result<Vec<u8>> {
    let iv = armor::unwrap(&metadata.iv).map_err(|e| e.with_context("invalid file iv"))?;
    let nonce: [u8; NONCE_LEN] = iv.as_slice().try_into().map_err(|_| {
        SealnoteError::with_kind(
            ErrorCategory::User,
            ErrorKind::MalformedEnvelope,
            format!("file iv must be {} bytes, got {}", NONCE_LEN, iv.len()),
        )
    })?;
    let ciphertext =
        armor::unwrap(ciphertext).map_err(|e| e.with_context("invalid file ciphertext"))?;
    debug!(
        ciphertext_len = ciphertext.len(),
        filename = %metadata.original_filename,
        "opening file"
    );
    cipher.decrypt(key, &nonce, &ciphertext)
}

/// Seals file contents under base-58 `key_text`.
pub fn seal_file(
    contents: &[u8],
    original_filename: &str,
    content_type: &str,
    key_text: &str,
) -> Result<SealedFile> {
    let key = SecretKey::from_text(key_text)?;
    seal_file_with(
        &mut OsRandom,
        &AesGcm,
        &key,
        contents,
        original_filename,
        content_type,
    )
}

/// Opens a sealed file's ciphertext using the nonce from its metadata.
pub fn open_file(metadata: &FileMetadata, ciphertext: &str, key_text: &str) -> Result<Vec<u8>> {
    let key = SecretKey::from_text(key_text)?;
    open_file_with(&AesGcm, &key, metadata, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{self, KeyStrength};
    use crate::random::FixedRandom;

    #[test]
    fn test_roundtrip() {
        let key_text = key::generate().unwrap();
        let contents = b"%PDF-1.7 not really";
        let sealed = seal_file(contents, "report.pdf", "application/pdf", &key_text).unwrap();

        assert_eq!(sealed.metadata.original_filename, "report.pdf");
        assert_eq!(sealed.metadata.content_type, "application/pdf");
        assert_eq!(armor::unwrap(&sealed.metadata.iv).unwrap().len(), NONCE_LEN);

        let opened = open_file(&sealed.metadata, &sealed.ciphertext, &key_text).unwrap();
        assert_eq!(opened, contents);
    }

    #[test]
    fn test_no_version_byte() {
        let mut rng = FixedRandom::new(vec![0]);
        let key = SecretKey::generate_with(&mut rng, KeyStrength::Aes128).unwrap();
        let sealed =
            seal_file_with(&mut rng, &AesGcm, &key, &[0u8; 16], "zeros", DEFAULT_CONTENT_TYPE)
                .unwrap();

        assert_eq!(sealed.metadata.iv, "AAAAAAAAAAAAAAAA");
        assert_eq!(
            hex::encode(armor::unwrap(&sealed.ciphertext).unwrap()),
            "0388dace60b6a392f328c2b971b2fe78ab6e47d42cec13bdf53a67b21257bddf"
        );
    }

    #[test]
    fn test_metadata_json_shape() {
        let metadata = FileMetadata {
            original_filename: "a.txt".to_owned(),
            content_type: "text/plain".to_owned(),
            iv: "AAAAAAAAAAAAAAAA".to_owned(),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "originalFilename": "a.txt",
                "contentType": "text/plain",
                "iv": "AAAAAAAAAAAAAAAA",
            })
        );
    }

    #[test]
    fn test_empty_file() {
        let key_text = key::generate().unwrap();
        let sealed = seal_file(b"", "empty", DEFAULT_CONTENT_TYPE, &key_text).unwrap();
        assert!(!sealed.ciphertext.is_empty());
        assert!(open_file(&sealed.metadata, &sealed.ciphertext, &key_text)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_wrong_iv_fails_authentication() {
        let key_text = key::generate().unwrap();
        let mut sealed = seal_file(b"data", "f", DEFAULT_CONTENT_TYPE, &key_text).unwrap();
        sealed.metadata.iv = armor::wrap(&[9u8; NONCE_LEN]);
        let err = open_file(&sealed.metadata, &sealed.ciphertext, &key_text).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_bad_iv_length_is_malformed() {
        let key_text = key::generate().unwrap();
        let mut sealed = seal_file(b"data", "f", DEFAULT_CONTENT_TYPE, &key_text).unwrap();
        sealed.metadata.iv = armor::wrap(&[0u8; 13]);
        let err = open_file(&sealed.metadata, &sealed.ciphertext, &key_text).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope));
    }

    #[test]
    fn test_bad_ciphertext_base64_is_malformed() {
        let key_text = key::generate().unwrap();
        let sealed = seal_file(b"data", "f", DEFAULT_CONTENT_TYPE, &key_text).unwrap();
        let err = open_file(&sealed.metadata, "%%%", &key_text).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope));
    }

    #[test]
    fn test_wrong_key() {
        let sealed = seal_file(b"data", "f", DEFAULT_CONTENT_TYPE, &key::generate().unwrap())
            .unwrap();
        let err = open_file(&sealed.metadata, &sealed.ciphertext, &key::generate().unwrap())
            .unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }
}
