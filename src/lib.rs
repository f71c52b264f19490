pub mod base58;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod store;
pub mod template;
