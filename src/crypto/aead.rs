//! AES-256-GCM at-rest encryption for the persisted secret key.
//!
//! Blob layout: `iv(16) || auth_tag(16) || ciphertext`.
//! The authentication tag must validate before any plaintext is trusted;
//! a tampered or truncated blob fails closed with a decryption error.
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use rand::RngCore;

use crate::crypto::sensitive::SensitiveBytes32;
use crate::error::{Error, Result};

/// AES-256-GCM with a 16-byte IV to match the persisted blob layout.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

pub const IV_LEN: usize = 16;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const HEADER_LEN: usize = IV_LEN + TAG_LEN;

/// Generate a random 256-bit symmetric key (the device identifier).
pub fn generate_key() -> SensitiveBytes32 {
    let mut key = [0u8; KEY_LEN];
    rand::rngs::OsRng.fill_bytes(&mut key);
    SensitiveBytes32::new(key)
}

/// Encrypt plaintext into a self-contained blob: `iv || tag || ciphertext`.
///
/// A fresh random IV is drawn per write.
pub fn encrypt_blob(key: &SensitiveBytes32, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm16::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Encryption(e.to_string()))?;

    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    let nonce = Nonce::<U16>::from_slice(&iv);

    // The RustCrypto AEAD API appends the tag to the ciphertext.
    let sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| Error::Encryption(e.to_string()))?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let mut blob = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(tag);
    blob.extend_from_slice(ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt_blob`].
///
/// Fails closed: a bad tag, wrong key or truncated blob yields
/// `Error::Decryption`, never partial plaintext.
pub fn decrypt_blob(key: &SensitiveBytes32, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < HEADER_LEN {
        return Err(Error::Decryption(format!(
            "Blob too short: {} bytes (minimum {})",
            blob.len(),
            HEADER_LEN
        )));
    }

    let iv = &blob[..IV_LEN];
    let tag = &blob[IV_LEN..HEADER_LEN];
    let ciphertext = &blob[HEADER_LEN..];

    let cipher = Aes256Gcm16::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Decryption(e.to_string()))?;
    let nonce = Nonce::<U16>::from_slice(iv);

    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    cipher
        .decrypt(nonce, sealed.as_slice())
        .map_err(|e| Error::Decryption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = generate_key();
        let plaintext = b"sixty-four bytes of secret key material would normally go here.";

        let blob = encrypt_blob(&key, plaintext).unwrap();
        assert_eq!(blob.len(), HEADER_LEN + plaintext.len());

        let decrypted = decrypt_blob(&key, &blob).unwrap();
        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn test_fresh_iv_per_write() {
        let key = generate_key();
        let a = encrypt_blob(&key, b"same plaintext").unwrap();
        let b = encrypt_blob(&key, b"same plaintext").unwrap();
        assert_ne!(a[..IV_LEN], b[..IV_LEN]);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = generate_key();
        let key2 = generate_key();

        let blob = encrypt_blob(&key1, b"secret").unwrap();
        assert!(decrypt_blob(&key2, &blob).is_err());
    }

    #[test]
    fn test_tampered_tag_fails() {
        let key = generate_key();
        let mut blob = encrypt_blob(&key, b"secret").unwrap();

        for bit in 0..8 {
            blob[IV_LEN] ^= 1 << bit;
            assert!(decrypt_blob(&key, &blob).is_err());
            blob[IV_LEN] ^= 1 << bit;
        }
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = generate_key();
        let mut blob = encrypt_blob(&key, b"secret").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert!(decrypt_blob(&key, &blob).is_err());
    }

    #[test]
    fn test_truncated_blob_fails() {
        let key = generate_key();
        let blob = encrypt_blob(&key, b"secret").unwrap();
        assert!(decrypt_blob(&key, &blob[..HEADER_LEN - 1]).is_err());
        assert!(decrypt_blob(&key, &blob[..blob.len() - 1]).is_err());
    }

    #[test]
    fn test_empty_plaintext() {
        let key = generate_key();
        let blob = encrypt_blob(&key, b"").unwrap();
        assert!(decrypt_blob(&key, &blob).unwrap().is_empty());
    }
}
