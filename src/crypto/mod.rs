//! Cryptographic core: keypairs, at-rest AEAD, PEM containers, signatures.
pub mod aead;
pub mod keypair;
pub mod pem;
pub mod sensitive;
pub mod sign;
