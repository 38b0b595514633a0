//! Random payload generation.
//!
//! Both the request payloads of the load client and the
//! response bodies of the echo server are drawn from the
//! same alphabet: the 52 ASCII letters.

use std::ops::Range;

use rand::Rng;

/// Lowercase followed by uppercase ASCII letters.
pub const ASCII_LETTERS: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a string of exactly `len` random ASCII letters
/// using the thread local rng.
pub fn random_ascii_letters(len: usize) -> String {
    random_ascii_letters_with_rng(&mut rand::rng(), len)
}

pub fn random_ascii_letters_with_rng<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ASCII_LETTERS[rng.random_range(0..ASCII_LETTERS.len())] as char)
        .collect()
}

/// Generate a random ASCII letter payload with a length picked
/// uniformly from `len_range`.
///
/// An empty range yields a payload of `len_range.start` letters.
pub fn random_payload_with_rng<R: Rng + ?Sized>(rng: &mut R, len_range: Range<usize>) -> Vec<u8> {
    let len = if len_range.is_empty() {
        len_range.start
    } else {
        rng.random_range(len_range)
    };
    random_ascii_letters_with_rng(rng, len).into_bytes()
}
