//! sealnote - client-side encrypted secret sharing
//!
//! Secrets are sealed locally with AES-GCM; only the ciphertext envelope is
//! meant to leave the machine. The key is rendered as base-58 text and
//! travels in the fragment of a share link.

#![forbid(unsafe_code)]

pub mod armor;
pub mod base58;
pub mod cipher;
pub mod envelope;
pub mod error;
pub mod file_envelope;
pub mod file_ops;
pub mod key;
pub mod key_source;
pub mod link;
pub mod random;
pub mod store;
