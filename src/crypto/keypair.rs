//! Ed25519 keypair type: generation and secret-key splitting.
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use crate::base58::KeyInput;
use crate::crypto::sensitive::{SensitiveBytes32, SensitiveBytes64};
use crate::error::{Error, Result};

pub const PUBLIC_KEY_LEN: usize = 32;
pub const PRIVATE_KEY_LEN: usize = 32;
pub const SECRET_KEY_LEN: usize = 64;
pub const SIGNATURE_LEN: usize = 64;

/// An Ed25519 keypair.
///
/// The 64-byte secret key is always `private || public`; the two halves
/// decompose losslessly and each is exactly 32 bytes.
#[derive(Clone)]
pub struct Keypair {
    public_key: [u8; PUBLIC_KEY_LEN],
    private_key: SensitiveBytes32,
}

impl Keypair {
    /// Generate a fresh random keypair. Performs no persistence.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self {
            public_key: signing_key.verifying_key().to_bytes(),
            private_key: SensitiveBytes32::new(signing_key.to_bytes()),
        }
    }

    /// Reconstruct a keypair from a 64-byte secret key in any representation.
    ///
    /// Fixed-offset split: `[0..32)` private half, `[32..64)` public half.
    pub fn from_secret_key(secret: KeyInput) -> Result<Self> {
        let bytes = secret.into_bytes()?;
        if bytes.len() != SECRET_KEY_LEN {
            return Err(Error::InvalidKey(format!(
                "Secret key must be {SECRET_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let private_key = SensitiveBytes32::from_slice(&bytes[..PRIVATE_KEY_LEN])
            .expect("split is exactly 32 bytes");
        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(&bytes[PRIVATE_KEY_LEN..]);
        Ok(Self {
            public_key,
            private_key,
        })
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    pub fn private_key(&self) -> &[u8; PRIVATE_KEY_LEN] {
        self.private_key.as_bytes()
    }

    /// The 64-byte secret key, `private || public`.
    pub fn secret_key(&self) -> SensitiveBytes64 {
        let mut bytes = [0u8; SECRET_KEY_LEN];
        bytes[..PRIVATE_KEY_LEN].copy_from_slice(self.private_key.as_bytes());
        bytes[PRIVATE_KEY_LEN..].copy_from_slice(&self.public_key);
        SensitiveBytes64::new(bytes)
    }
}
