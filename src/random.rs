//! Source of randomness for keys and nonces
//!
//! Sealing never reaches for a global generator; callers hand in a
//! [`RandomSource`]. Production code uses [`OsRandom`]; tests can pass a
//! fixed source to get byte-for-byte reproducible envelopes.

use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use rand::RngCore;
use rand::rngs::OsRng;

/// Fills buffers with random bytes.
pub trait RandomSource {
    /// Overwrite all of `buf` with random bytes.
    fn fill(&mut self, buf: &mut [u8]) -> Result<()>;
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        OsRng.try_fill_bytes(buf).map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::RandomUnavailable,
                "failed to read from the operating system random source",
                e,
            )
        })
    }
}

/// Repeats a fixed byte pattern.
///
/// Only for tests and known-answer vectors. NEVER use this to seal real
/// secrets: every nonce it produces is the same.
#[derive(Debug, Clone)]
pub struct FixedRandom {
    pattern: Vec<u8>,
}

impl FixedRandom {
    pub fn new(pattern: Vec<u8>) -> Self {
        Self { pattern }
    }
}

impl RandomSource for FixedRandom {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(SealnoteError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "fixed random source has an empty pattern",
            ));
        }
        for (dst, src) in buf.iter_mut().zip(self.pattern.iter().cycle()) {
            *dst = *src;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_random_fills_buffer() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        OsRandom.fill(&mut a).unwrap();
        OsRandom.fill(&mut b).unwrap();
        // 2^-256 chance of a false failure.
        assert_ne!(a, b);
    }

    #[test]
    fn test_fixed_random_cycles_pattern() {
        let mut rng = FixedRandom::new(vec![1, 2, 3]);
        let mut buf = [0u8; 7];
        rng.fill(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn test_fixed_random_empty_pattern() {
        let mut rng = FixedRandom::new(Vec::new());
        let err = rng.fill(&mut [0u8; 4]).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InternalInvariant));
    }
}
