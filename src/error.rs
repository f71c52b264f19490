use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid Base58 character '{0}'")]
    Base58(char),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Malformed envelope: {0}")]
    Envelope(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
