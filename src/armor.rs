//! Base-64 transport encoding for envelopes
//!
//! Envelopes and file ciphertexts travel as standard (padded) base-64 so they
//! fit in a JSON string field. Surrounding whitespace, such as the trailing
//! newline of a file written by hand, is ignored when decoding.

use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Encode bytes for transport.
pub fn wrap(body: &[u8]) -> String {
    STANDARD.encode(body)
}

/// Decode transported text back into bytes.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    STANDARD.decode(armored.trim()).map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedEnvelope,
            "base64 decoding failed",
            e,
        )
    })
}
