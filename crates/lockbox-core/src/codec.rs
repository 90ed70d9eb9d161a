//! Base64 transport encoding for raw key material.
//!
//! Standard alphabet with `=` padding. Decoding is strict: the input length
//! must be a multiple of four and padding may only appear at the end.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::CodecError;

/// Encode bytes as padded standard base64. Empty input gives an empty string.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    STANDARD.encode(bytes)
}

/// Decode padded standard base64.
///
/// # Errors
///
/// Returns [`CodecError::InvalidEncoding`] if the length is not a multiple of
/// four, a character is outside the alphabet, or padding is misplaced.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    check_len(text)?;
    STANDARD
        .decode(text)
        .map_err(|e| CodecError::InvalidEncoding {
            reason: e.to_string(),
        })
}

/// Decode into a caller-supplied buffer and return the number of bytes
/// written.
///
/// # Errors
///
/// Returns [`CodecError::InvalidEncoding`] for the same reasons as
/// [`decode`], and also when `out` is smaller than the decoded size.
pub fn decode_into(text: &str, out: &mut [u8]) -> Result<usize, CodecError> {
    check_len(text)?;
    STANDARD
        .decode_slice(text, out)
        .map_err(|e| CodecError::InvalidEncoding {
            reason: e.to_string(),
        })
}

fn check_len(text: &str) -> Result<(), CodecError> {
    if text.len() % 4 == 0 {
        Ok(())
    } else {
        Err(CodecError::InvalidEncoding {
            reason: format!("length {} is not a multiple of 4", text.len()),
        })
    }
}
