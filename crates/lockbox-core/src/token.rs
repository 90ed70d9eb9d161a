//! Opaque bearer token generation.
//!
//! Every character is drawn from the OS CSPRNG. The alphabet is restricted to
//! characters that are valid in an HTTP header value and need no quoting in a
//! shell.

use rand::Rng;
use rand::rngs::OsRng;

/// Length of session and provisioning tokens.
pub const SESSION_TOKEN_LEN: usize = 32;

const ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~+=@%^";

/// Generate a random token of `length` characters.
#[must_use]
pub fn generate_token(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}
