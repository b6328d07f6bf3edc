//! Base-58 text encoding for binary keys
//!
//! Uses the Bitcoin alphabet, which leaves out `0`, `O`, `I` and `l` so the
//! result is easy to read aloud and safe to place in a URL fragment.
//!
//! The input is treated as a big-endian unsigned integer. Conversion works on
//! a growable array of digits rather than a big-integer type: each input
//! symbol multiplies the accumulated value by the source radix and adds the
//! symbol, with carries pushed through the existing digits. Leading zero
//! bytes carry no numeric weight, so they are counted separately and written
//! as one `'1'` each (and read back the same way).

use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};

/// The 58 symbols, in digit order.
pub const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const RADIX: u32 = 58;

/// Encode bytes as base-58 text.
///
/// Empty input gives an empty string; `n` zero bytes give `n` copies of `'1'`.
pub fn encode(input: &[u8]) -> String {
    // Little-endian base-58 digits of the value seen so far.
    // log(256) / log(58) is just under 1.37.
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 137 / 100 + 1);

    for &byte in input {
        let mut carry = u32::from(byte);
        for digit in digits.iter_mut() {
            carry += u32::from(*digit) << 8;
            *digit = (carry % RADIX) as u8;
            carry /= RADIX;
        }
        while carry > 0 {
            digits.push((carry % RADIX) as u8);
            carry /= RADIX;
        }
    }

    let zeros = input.iter().take_while(|&&b| b == 0).count();

    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat_n(char::from(ALPHABET[0]), zeros));
    out.extend(
        digits
            .iter()
            .rev()
            .map(|&d| char::from(ALPHABET[usize::from(d)])),
    );
    out
}

/// Decode base-58 text back into bytes.
///
/// Fails with [`ErrorKind::InvalidEncoding`] on the first character that is
/// not part of the alphabet.
pub fn decode(input: &str) -> Result<Vec<u8>> {
    // Little-endian base-256 digits of the value seen so far.
    let mut bytes: Vec<u8> = Vec::with_capacity(input.len() * 733 / 1000 + 1);

    for (pos, ch) in input.chars().enumerate() {
        let value = digit_value(ch).ok_or_else(|| {
            SealnoteError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidEncoding,
                format!("invalid base-58 character {:?} at position {}", ch, pos),
            )
        })?;

        let mut carry = u32::from(value);
        for byte in bytes.iter_mut() {
            carry += u32::from(*byte) * RADIX;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let zeros = input
        .bytes()
        .take_while(|&c| c == ALPHABET[0])
        .count();

    let mut out = Vec::with_capacity(zeros + bytes.len());
    out.resize(zeros, 0u8);
    out.extend(bytes.iter().rev());
    Ok(out)
}

fn digit_value(ch: char) -> Option<u8> {
    if !ch.is_ascii() {
        return None;
    }
    let ch = ch as u8;
    ALPHABET
        .iter()
        .position(|&symbol| symbol == ch)
        .map(|idx| idx as u8)
}
