//! Master key file for the SQLite backend.
//!
//! The master key that seals item values is itself kept on disk wrapped
//! with a key derived from machine-specific data (hostname and username).
//! This only protects against the file being copied to another machine or
//! user account; it is not a substitute for a hardware-backed keychain.
//!
//! File layout (binary):
//! ```text
//! [32 bytes: PBKDF2 salt]
//! [12 bytes: AES-256-GCM nonce]
//! [remaining: wrapped master key + 16-byte tag]
//! ```

use std::path::{Path, PathBuf};

use crate::crypto;
use crate::error::{Result, StorageError};

/// Associated data binding the wrapped key to this file format.
const WRAP_AAD: &[u8] = b"securestore-master-key-v1";

/// An on-disk, device-wrapped master key.
#[derive(Debug, Clone)]
pub struct MasterKeyFile {
    path: PathBuf,
}

impl MasterKeyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/master.key`.
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("master.key")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the master key, generating and persisting a new one on first
    /// use.
    pub fn load_or_create(&self) -> Result<Vec<u8>> {
        if self.exists() {
            return self.load();
        }
        let key = crypto::random_bytes(crypto::KEY_LEN)?;
        self.store(&key)?;
        tracing::info!(path = %self.path.display(), "generated new master key");
        Ok(key)
    }

    /// Load and unwrap an existing master key.
    pub fn load(&self) -> Result<Vec<u8>> {
        let data = std::fs::read(&self.path)?;
        if data.len() < crypto::SALT_LEN + crypto::NONCE_LEN_BYTES + crypto::TAG_LEN {
            return Err(StorageError::KeyDerivationFailed {
                reason: format!("master key file {} is truncated", self.path.display()),
            });
        }

        let (salt, rest) = data.split_at(crypto::SALT_LEN);
        let (nonce, wrapped) = rest.split_at(crypto::NONCE_LEN_BYTES);

        let wrapping_key = crypto::derive_key(&device_material(), salt);
        let key = crypto::open(nonce, wrapped, &wrapping_key, WRAP_AAD).map_err(|_| {
            StorageError::KeyDerivationFailed {
                reason: "master key cannot be unwrapped on this machine".into(),
            }
        })?;

        tracing::debug!(path = %self.path.display(), "loaded master key");
        Ok(key)
    }

    /// Wrap `key` and write it to the file, replacing any previous key.
    pub fn store(&self, key: &[u8]) -> Result<()> {
        let salt = crypto::random_bytes(crypto::SALT_LEN)?;
        let wrapping_key = crypto::derive_key(&device_material(), &salt);
        let (nonce, wrapped) = crypto::seal(key, &wrapping_key, WRAP_AAD)?;

        let mut data = Vec::with_capacity(salt.len() + nonce.len() + wrapped.len());
        data.extend_from_slice(&salt);
        data.extend_from_slice(&nonce);
        data.extend_from_slice(&wrapped);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, &data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

/// Machine identifiers mixed into the wrapping key.
fn device_material() -> Vec<u8> {
    let hostname = hostname();
    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".into());

    let mut material = Vec::with_capacity(hostname.len() + username.len() + WRAP_AAD.len() + 2);
    material.extend_from_slice(hostname.as_bytes());
    material.push(0);
    material.extend_from_slice(username.as_bytes());
    material.push(0);
    material.extend_from_slice(WRAP_AAD);
    material
}

fn hostname() -> String {
    #[cfg(unix)]
    {
        std::fs::read_to_string("/etc/hostname")
            .map(|s| s.trim().to_string())
            .or_else(|_| std::env::var("HOSTNAME"))
            .or_else(|_| std::env::var("HOST"))
            .unwrap_or_else(|_| "unknown-host".into())
    }

    #[cfg(not(unix))]
    {
        std::env::var("COMPUTERNAME")
            .or_else(|_| std::env::var("HOSTNAME"))
            .unwrap_or_else(|_| "unknown-host".into())
    }
}
