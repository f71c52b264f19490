//! Base58 codec used for every human-displayed key, signature and token.
//!
//! Big-number base conversion between base-256 and the 58-symbol alphabet
//! (no `0`, `O`, `I` or `l`). Leading zero bytes map one-to-one to leading
//! `'1'` characters, matching standard Base58 semantics.

use crate::error::{Error, Result};

pub const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Encode bytes as a Base58 string.
pub fn encode(input: &[u8]) -> String {
    // Little-endian base-58 digits, most significant last.
    let mut digits: Vec<u32> = Vec::new();
    for &byte in input {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += *digit << 8;
            *digit = carry % 58;
            carry /= 58;
        }
        while carry > 0 {
            digits.push(carry % 58);
            carry /= 58;
        }
    }
    for _ in input.iter().take_while(|&&b| b == 0) {
        digits.push(0);
    }
    digits
        .iter()
        .rev()
        .map(|&d| ALPHABET[d as usize] as char)
        .collect()
}

/// Decode a Base58 string back into bytes.
///
/// Any character outside the alphabet is an input-format error.
pub fn decode(input: &str) -> Result<Vec<u8>> {
    let mut bytes: Vec<u32> = Vec::new();
    for ch in input.chars() {
        let value = ALPHABET
            .iter()
            .position(|&a| a as char == ch)
            .ok_or(Error::Base58(ch))? as u32;

        let mut carry = value;
        for byte in bytes.iter_mut() {
            carry += *byte * 58;
            *byte = carry & 0xff;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push(carry & 0xff);
            carry >>= 8;
        }
    }
    for _ in input.chars().take_while(|&c| c == '1') {
        bytes.push(0);
    }
    Ok(bytes.iter().rev().map(|&b| b as u8).collect())
}

/// A key, signature or secret supplied in any accepted representation.
///
/// Callers hand over raw bytes or a Base58 string; everything past the API
/// boundary works with one canonical byte sequence.
#[derive(Debug, Clone)]
pub enum KeyInput {
    Raw(Vec<u8>),
    Base58(String),
}

impl KeyInput {
    /// Normalize to raw bytes, decoding Base58 if necessary.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            KeyInput::Raw(bytes) => Ok(bytes),
            KeyInput::Base58(text) => decode(text.trim()),
        }
    }
}

impl From<Vec<u8>> for KeyInput {
    fn from(bytes: Vec<u8>) -> Self {
        KeyInput::Raw(bytes)
    }
}

impl From<&[u8]> for KeyInput {
    fn from(bytes: &[u8]) -> Self {
        KeyInput::Raw(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for KeyInput {
    fn from(bytes: [u8; N]) -> Self {
        KeyInput::Raw(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for KeyInput {
    fn from(bytes: &[u8; N]) -> Self {
        KeyInput::Raw(bytes.to_vec())
    }
}

impl From<&str> for KeyInput {
    fn from(text: &str) -> Self {
        KeyInput::Base58(text.to_string())
    }
}

impl From<String> for KeyInput {
    fn from(text: String) -> Self {
        KeyInput::Base58(text)
    }
}
