//! The storage collaborator and the share/retrieve flow
//!
//! The store only ever sees ciphertext. Sharing seals locally, uploads, and
//! hands back a [`ShareLink`] whose fragment holds the key; retrieving parses
//! the link, fetches, and opens locally.
//!
//! A fetch yields one of two shapes: a text secret comes back whole, while a
//! file comes back as metadata only and its blob is fetched separately.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::armor;
use crate::cipher::{AeadCipher, AesGcm};
use crate::envelope::{self, EnvelopeFormat};
use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::file_envelope::{self, FileMetadata};
use crate::key::{KeyStrength, SecretKey};
use crate::link::{LinkTarget, ShareLink};
use crate::random::{OsRandom, RandomSource};

/// Prefix of file ids.
pub const FILE_ID_PREFIX: &str = "spf-";

/// A stored text secret: the base-64 envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretPayload {
    pub secret: String,
}

/// A stored file, minus its blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMetadata {
    pub file: FileMetadata,
}

/// What the store returns for an id.
///
/// Over the wire the two shapes are told apart by their fields, hence
/// `untagged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretResponse {
    Payload(SecretPayload),
    Metadata(SecretMetadata),
}

/// A remote key-value blob store.
pub trait SecretStore {
    /// Stores a base-64 envelope and returns its id.
    fn put_secret(&mut self, envelope: &str) -> Result<String>;

    /// Stores a file's metadata and base-64 ciphertext, returning its id.
    fn put_file(&mut self, metadata: &FileMetadata, ciphertext: &str) -> Result<String>;

    fn fetch(&self, id: &str) -> Result<SecretResponse>;

    /// The base-64 ciphertext of a file.
    fn fetch_blob(&self, id: &str) -> Result<String>;
}

/// Keeps everything in a map. Ids are sequential.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Entry>,
    next_id: u64,
}

#[derive(Debug)]
enum Entry {
    Secret(String),
    File {
        metadata: FileMetadata,
        ciphertext: String,
    },
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn mint_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{:08x}", prefix, self.next_id)
    }

    fn entry(&self, id: &str) -> Result<&Entry> {
        self.entries.get(id).ok_or_else(|| {
            SealnoteError::with_kind(
                ErrorCategory::User,
                ErrorKind::NotFound,
                format!("no secret stored under {}", id),
            )
        })
    }
}

impl SecretStore for MemoryStore {
    fn put_secret(&mut self, envelope: &str) -> Result<String> {
        let id = self.mint_id("");
        self.entries
            .insert(id.clone(), Entry::Secret(envelope.to_owned()));
        Ok(id)
    }

    fn put_file(&mut self, metadata: &FileMetadata, ciphertext: &str) -> Result<String> {
        let id = self.mint_id(FILE_ID_PREFIX);
        self.entries.insert(
            id.clone(),
            Entry::File {
                metadata: metadata.clone(),
                ciphertext: ciphertext.to_owned(),
            },
        );
        Ok(id)
    }

    fn fetch(&self, id: &str) -> Result<SecretResponse> {
        Ok(match self.entry(id)? {
            Entry::Secret(secret) => SecretResponse::Payload(SecretPayload {
                secret: secret.clone(),
            }),
            Entry::File { metadata, .. } => SecretResponse::Metadata(SecretMetadata {
                file: metadata.clone(),
            }),
        })
    }

    fn fetch_blob(&self, id: &str) -> Result<String> {
        match self.entry(id)? {
            Entry::File { ciphertext, .. } => Ok(ciphertext.clone()),
            Entry::Secret(_) => Err(SealnoteError::with_kind(
                ErrorCategory::User,
                ErrorKind::NotFound,
                format!("{} is a text secret, not a file", id),
            )),
        }
    }
}

/// A retrieved secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieved {
    Text(String),
    File {
        metadata: FileMetadata,
        contents: Vec<u8>,
    },
}

/// Seals `text` under a fresh key, uploads it, and returns the link.
pub fn share_text(store: &mut dyn SecretStore, text: &str) -> Result<ShareLink> {
    share_text_with(store, &mut OsRandom, &AesGcm, text, KeyStrength::default())
}

pub fn share_text_with(
    store: &mut dyn SecretStore,
    random: &mut dyn RandomSource,
    cipher: &dyn AeadCipher,
    text: &str,
    strength: KeyStrength,
) -> Result<ShareLink> {
    let key = SecretKey::generate_with(random, strength)?;
    let raw = envelope::seal_with(
        random,
        cipher,
        &key,
        text.as_bytes(),
        EnvelopeFormat::for_key(strength),
    )?;
    let id = store
        .put_secret(&armor::wrap(&raw))
        .map_err(|e| e.with_context("failed to upload secret"))?;
    info!(%id, "shared text secret");
    Ok(ShareLink::new(LinkTarget::Secret(id), key.to_text()))
}

/// Seals a file under a fresh key, uploads it, and returns the link.
pub fn share_file(
    store: &mut dyn SecretStore,
    contents: &[u8],
    original_filename: &str,
    content_type: &str,
) -> Result<ShareLink> {
    let key = SecretKey::generate_with(&mut OsRandom, KeyStrength::default())?;
    let sealed = file_envelope::seal_file_with(
        &mut OsRandom,
        &AesGcm,
        &key,
        contents,
        original_filename,
        content_type,
    )?;
    let id = store
        .put_file(&sealed.metadata, &sealed.ciphertext)
        .map_err(|e| e.with_context("failed to upload file"))?;
    info!(%id, "shared file");
    Ok(ShareLink::new(LinkTarget::File(id), key.to_text()))
}

/// Fetches and opens whatever `link` points at.
pub fn retrieve(store: &dyn SecretStore, link: &ShareLink) -> Result<Retrieved> {
    let id = link.target.id();
    let response = store
        .fetch(id)
        .map_err(|e| e.with_context(format!("failed to fetch {}", id)))?;
    debug!(%id, "fetched secret");

    match response {
        SecretResponse::Payload(payload) => {
            let text = envelope::open_text(&payload.secret, &link.key)?;
            Ok(Retrieved::Text(text))
        }
        SecretResponse::Metadata(meta) => {
            let ciphertext = store
                .fetch_blob(id)
                .map_err(|e| e.with_context(format!("failed to fetch blob for {}", id)))?;
            let contents = file_envelope::open_file(&meta.file, &ciphertext, &link.key)?;
            Ok(Retrieved::File {
                metadata: meta.file,
                contents,
            })
        }
    }
}
