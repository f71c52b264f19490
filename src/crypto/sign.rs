//! Detached Ed25519 signing and verification.
//!
//! Sign/verify operate directly on the UTF-8 message bytes; Ed25519's
//! internal hashing applies, no pre-hash stage.
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::base58::KeyInput;
use crate::crypto::keypair::{Keypair, PRIVATE_KEY_LEN, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use crate::crypto::pem::{self, KeyRole, PemKey};
use crate::error::{Error, Result};
use crate::store::{KeyStore, StorageProvider};

/// Sign a message with an explicit 32-byte private key.
pub fn sign_detached(message: &str, private_key: &[u8; PRIVATE_KEY_LEN]) -> [u8; SIGNATURE_LEN] {
    let signing_key = SigningKey::from_bytes(private_key);
    signing_key.sign(message.as_bytes()).to_bytes()
}

/// Sign a message. If no key is supplied, the keypair is loaded from the
/// key-at-rest store.
pub fn sign<P: StorageProvider>(
    message: &str,
    private_key: Option<KeyInput>,
    store: &KeyStore<P>,
) -> Result<[u8; SIGNATURE_LEN]> {
    match private_key {
        Some(input) => {
            let bytes = input.into_bytes()?;
            let key: &[u8; PRIVATE_KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
                Error::InvalidKey(format!(
                    "Private key must be {PRIVATE_KEY_LEN} bytes, got {}",
                    bytes.len()
                ))
            })?;
            Ok(sign_detached(message, key))
        }
        None => {
            let keypair = store
                .load()?
                .ok_or_else(|| Error::NotFound("Keypair".into()))?;
            Ok(sign_detached(message, keypair.private_key()))
        }
    }
}

/// Sign with a private key supplied as a PEM container.
pub fn sign_with_pem(message: &str, container: &str) -> Result<[u8; SIGNATURE_LEN]> {
    match pem::from_pem(container)? {
        (KeyRole::Private, raw) => Ok(sign_detached(message, &raw)),
        (KeyRole::Public, _) => Err(Error::InvalidKey(
            "Signing requires a PRIVATE KEY container".into(),
        )),
    }
}

/// Verify a detached signature against a public key.
///
/// Returns `Ok(false)` for a structurally valid but cryptographically wrong
/// combination; errors only on structurally invalid input (wrong-length key,
/// undecodable Base58, non-canonical curve point).
pub fn verify(message: &str, public_key: KeyInput, signature: KeyInput) -> Result<bool> {
    let key_bytes = public_key.into_bytes()?;
    let key: &[u8; PUBLIC_KEY_LEN] = key_bytes.as_slice().try_into().map_err(|_| {
        Error::InvalidKey(format!(
            "Public key must be {PUBLIC_KEY_LEN} bytes, got {}",
            key_bytes.len()
        ))
    })?;
    let verifying_key = VerifyingKey::from_bytes(key)
        .map_err(|e| Error::InvalidKey(format!("Invalid public key: {e}")))?;

    let sig_bytes = signature.into_bytes()?;
    let sig: &[u8; SIGNATURE_LEN] = sig_bytes.as_slice().try_into().map_err(|_| {
        Error::InvalidKey(format!(
            "Signature must be {SIGNATURE_LEN} bytes, got {}",
            sig_bytes.len()
        ))
    })?;

    Ok(verifying_key
        .verify(message.as_bytes(), &Signature::from_bytes(sig))
        .is_ok())
}

/// Verify with a public key supplied as a PEM container.
pub fn verify_with_pem(message: &str, container: &str, signature: KeyInput) -> Result<bool> {
    match pem::from_pem(container)? {
        (KeyRole::Public, raw) => verify(message, raw.into(), signature),
        (KeyRole::Private, _) => Err(Error::InvalidKey(
            "Verification requires a PUBLIC KEY container".into(),
        )),
    }
}

/// Print-ready PEM containers for both halves of a keypair.
pub fn keypair_containers(keypair: &Keypair) -> (String, String) {
    (
        pem::to_pem(PemKey::Private(keypair.private_key())),
        pem::to_pem(PemKey::Public(keypair.public_key())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base58;

    #[test]
    fn test_sign_verify_roundtrip() {
        let kp = Keypair::generate();
        let message = "I verify this message.";

        let sig = sign_detached(message, kp.private_key());
        assert_eq!(sig.len(), SIGNATURE_LEN);
        assert!(verify(message, kp.public_key().into(), sig.into()).unwrap());
    }

    #[test]
    fn test_wrong_public_key_is_false_not_error() {
        let kp = Keypair::generate();
        let other = Keypair::generate();
        let sig = sign_detached("hello world", kp.private_key());

        let verified = verify("hello world", other.public_key().into(), sig.into()).unwrap();
        assert!(!verified);
    }

    #[test]
    fn test_tampered_message_is_false() {
        let kp = Keypair::generate();
        let sig = sign_detached("original", kp.private_key());
        assert!(!verify("tampered", kp.public_key().into(), sig.into()).unwrap());
    }

    #[test]
    fn test_base58_inputs() {
        let kp = Keypair::generate();
        let message = "base58 all the way down";
        let sig = sign_detached(message, kp.private_key());

        let pub_b58 = base58::encode(kp.public_key());
        let sig_b58 = base58::encode(&sig);
        assert!(verify(message, pub_b58.as_str().into(), sig_b58.as_str().into()).unwrap());
    }

    #[test]
    fn test_structurally_invalid_inputs_error() {
        let kp = Keypair::generate();
        let sig = sign_detached("m", kp.private_key());

        // Wrong-length public key.
        assert!(verify("m", vec![0u8; 31].into(), sig.into()).is_err());
        // Wrong-length signature.
        assert!(verify("m", kp.public_key().into(), vec![0u8; 63].into()).is_err());
        // Undecodable Base58.
        assert!(verify("m", "not-base58-0OIl".into(), sig.into()).is_err());
    }

    #[test]
    fn test_pem_backed_sign_and_verify() {
        let kp = Keypair::generate();
        let (private_pem, public_pem) = keypair_containers(&kp);
        let message = "containers";

        let sig = sign_with_pem(message, &private_pem).unwrap();
        assert!(verify_with_pem(message, &public_pem, sig.into()).unwrap());

        // Role mix-ups are structural errors.
        assert!(sign_with_pem(message, &public_pem).is_err());
        assert!(verify_with_pem(message, &private_pem, sig.into()).is_err());
    }
}
