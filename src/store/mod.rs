//! Key-at-rest store: the device identifier and the encrypted keypair blob.
//!
//! Core logic depends only on the [`StorageProvider`] capability so tests
//! run against an in-memory fake. On disk, first-time creation uses atomic
//! create-if-absent, so two processes racing to initialize cannot both win:
//! one creates the artifact, the other observes it already exists.
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};
use zeroize::Zeroize;

use crate::base58::{self, KeyInput};
use crate::crypto::aead;
use crate::crypto::keypair::Keypair;
use crate::crypto::sensitive::SensitiveBytes32;
use crate::error::{Error, Result};

/// The persisted artifacts the store owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// 32 random bytes used solely as the at-rest encryption key.
    DeviceId,
    /// The encrypted secret-key blob (`iv || tag || ciphertext`).
    KeyData,
    /// Base58 public key kept in plaintext for display.
    PublicKey,
}

impl Artifact {
    fn file_name(self) -> &'static str {
        match self {
            Artifact::DeviceId => "id.bin",
            Artifact::KeyData => "data.bin",
            Artifact::PublicKey => "public.key",
        }
    }
}

/// Storage capability the store depends on.
pub trait StorageProvider {
    fn read(&self, artifact: Artifact) -> Result<Option<Vec<u8>>>;
    fn write(&self, artifact: Artifact, data: &[u8]) -> Result<()>;
    /// Atomic create-if-absent. Returns `true` if this call created the
    /// artifact, `false` if it already existed.
    fn create_new(&self, artifact: Artifact, data: &[u8]) -> Result<bool>;
    fn exists(&self, artifact: Artifact) -> bool;
}

/// Filesystem-backed provider. The device identifier lives under the user
/// config directory, key data and the public-key display copy under the
/// data directory.
pub struct FsStorage {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl FsStorage {
    /// Open the per-user default locations, creating directories as needed.
    pub fn open() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "attesta")
            .ok_or_else(|| Error::NotFound("Home directory".into()))?;
        Self::at(dirs.config_dir(), dirs.data_dir())
    }

    pub fn at(config_dir: &Path, data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(config_dir)?;
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        let dir = match artifact {
            Artifact::DeviceId => &self.config_dir,
            Artifact::KeyData | Artifact::PublicKey => &self.data_dir,
        };
        dir.join(artifact.file_name())
    }
}

impl StorageProvider for FsStorage {
    fn read(&self, artifact: Artifact) -> Result<Option<Vec<u8>>> {
        let path = self.path(artifact);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    fn write(&self, artifact: Artifact, data: &[u8]) -> Result<()> {
        fs::write(self.path(artifact), data)?;
        Ok(())
    }

    fn create_new(&self, artifact: Artifact, data: &[u8]) -> Result<bool> {
        let path = self.path(artifact);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(data)?;
                file.sync_all()?;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, artifact: Artifact) -> bool {
        self.path(artifact).exists()
    }
}

/// In-memory provider for tests.
#[derive(Default)]
pub struct MemStorage {
    entries: Mutex<HashMap<Artifact, Vec<u8>>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageProvider for MemStorage {
    fn read(&self, artifact: Artifact) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap().get(&artifact).cloned())
    }

    fn write(&self, artifact: Artifact, data: &[u8]) -> Result<()> {
        self.entries.lock().unwrap().insert(artifact, data.to_vec());
        Ok(())
    }

    fn create_new(&self, artifact: Artifact, data: &[u8]) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&artifact) {
            return Ok(false);
        }
        entries.insert(artifact, data.to_vec());
        Ok(true)
    }

    fn exists(&self, artifact: Artifact) -> bool {
        self.entries.lock().unwrap().contains_key(&artifact)
    }
}

/// Outcome of an `initialize` call. Re-running setup is a non-fatal no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    AlreadyInitialized,
}

/// The keypair store: Uninitialized (no key data) or Initialized.
pub struct KeyStore<P: StorageProvider> {
    provider: P,
}

impl<P: StorageProvider> KeyStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn is_initialized(&self) -> bool {
        self.provider.exists(Artifact::KeyData)
    }

    /// Set up the persisted keypair.
    ///
    /// With a supplied 64-byte secret key the keypair is reconstructed from
    /// it; otherwise a fresh one is generated. Idempotent: an initialized
    /// store reports `AlreadyInitialized` instead of erroring.
    pub fn initialize(&self, secret_key: Option<KeyInput>) -> Result<InitOutcome> {
        if self.is_initialized() {
            debug!("key store already initialized");
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let keypair = match secret_key {
            Some(secret) => Keypair::from_secret_key(secret)?,
            None => Keypair::generate(),
        };

        let device_id = self.device_identifier()?;
        let blob = aead::encrypt_blob(&device_id, keypair.secret_key().as_bytes())?;
        if !self.provider.create_new(Artifact::KeyData, &blob)? {
            // Lost the first-run race to another process.
            return Ok(InitOutcome::AlreadyInitialized);
        }
        self.provider.write(
            Artifact::PublicKey,
            base58::encode(keypair.public_key()).as_bytes(),
        )?;

        info!("key store initialized");
        Ok(InitOutcome::Created)
    }

    /// Decrypt and reconstruct the persisted keypair.
    ///
    /// `None` when the store was never set up. An authentication failure on
    /// the blob (tampering, missing device identifier) fails closed with a
    /// decryption error.
    pub fn load(&self) -> Result<Option<Keypair>> {
        let Some(blob) = self.provider.read(Artifact::KeyData)? else {
            return Ok(None);
        };
        let device_id = self.device_identifier()?;
        let mut secret = aead::decrypt_blob(&device_id, &blob)?;
        let keypair = Keypair::from_secret_key(secret.as_slice().into());
        secret.zeroize();
        keypair.map(Some)
    }

    /// The Base58 public key kept in plaintext for display.
    pub fn public_key(&self) -> Result<Option<String>> {
        let Some(bytes) = self.provider.read(Artifact::PublicKey)? else {
            return Ok(None);
        };
        let text = String::from_utf8(bytes)
            .map_err(|_| Error::InvalidKey("Public key file is not UTF-8".into()))?;
        Ok(Some(text.trim().to_string()))
    }

    /// The at-rest encryption key, created lazily on first use.
    ///
    /// Loss of this artifact makes an existing encrypted blob permanently
    /// unreadable; there is no recovery path.
    fn device_identifier(&self) -> Result<SensitiveBytes32> {
        if !self.provider.exists(Artifact::DeviceId) {
            let fresh = aead::generate_key();
            // A racing process may create it first; fall through to read.
            self.provider.create_new(Artifact::DeviceId, fresh.as_bytes())?;
        }
        let bytes = self
            .provider
            .read(Artifact::DeviceId)?
            .ok_or_else(|| Error::NotFound("Device identifier".into()))?;
        SensitiveBytes32::from_slice(&bytes)
            .ok_or_else(|| Error::InvalidKey("Device identifier must be 32 bytes".into()))
    }
}
