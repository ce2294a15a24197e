//! The public secure storage operations.
//!
//! [`SecureStorage`] owns the two namespace handles and implements
//! `set`, `get`, `remove`, `clear`, `keys` and `platform` on top of them.
//! It caches nothing; every call goes straight to the credential store, and
//! each call runs to completion before returning.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use securestore_core::{MemoryStore, SecureStorage, StorageMode};
//!
//! # fn example() -> securestore_core::Result<()> {
//! let storage = SecureStorage::new(
//!     Arc::new(MemoryStore::new()),
//!     "SwiftKeychainWrapper",
//!     "cap_sec",
//! );
//!
//! storage.set("token", "abc", StorageMode::Standard)?;
//! assert_eq!(storage.get("token", StorageMode::Standard)?, "abc");
//! assert_eq!(storage.keys(), vec!["token".to_string()]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::sync::Arc;

use crate::backend::CredentialStore;
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::migration::MigrationPolicy;
use crate::mode::StorageMode;
use crate::namespace::Namespace;
use crate::slot::SecureSlot;

/// Secure key-value storage over a legacy and a dedicated namespace.
#[derive(Debug, Clone)]
pub struct SecureStorage {
    legacy: Namespace,
    dedicated: Namespace,
    platform: String,
}

impl SecureStorage {
    /// Bind both namespaces to `store`. The platform identifier defaults to
    /// the target OS name.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        legacy_service: impl Into<String>,
        dedicated_service: impl Into<String>,
    ) -> Self {
        Self {
            legacy: Namespace::new(legacy_service, store.clone()),
            dedicated: Namespace::new(dedicated_service, store),
            platform: std::env::consts::OS.to_string(),
        }
    }

    /// Bind both namespaces to `store` using the labels and platform from
    /// `config`.
    pub fn from_config(store: Arc<dyn CredentialStore>, config: &StorageConfig) -> Self {
        Self::new(
            store,
            config.legacy_service.clone(),
            config.dedicated_service.clone(),
        )
        .with_platform(config.platform_name())
    }

    /// Override the platform identifier reported by [`platform`](Self::platform).
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn legacy(&self) -> &Namespace {
        &self.legacy
    }

    pub fn dedicated(&self) -> &Namespace {
        &self.dedicated
    }

    /// Store `value` under `key`.
    ///
    /// In [`StorageMode::UserPresence`] this wipes the dedicated namespace
    /// before writing the gated entry.
    ///
    /// # Errors
    ///
    /// [`StorageError::WriteFailed`] if the store rejects the write.
    pub fn set(&self, key: &str, value: &str, mode: StorageMode) -> Result<bool> {
        match mode {
            StorageMode::Standard => {
                self.dedicated
                    .set(key, value)
                    .map_err(|e| StorageError::WriteFailed {
                        key: key.to_owned(),
                        reason: e.to_string(),
                    })?;
                tracing::debug!(key, "stored value");
            }
            StorageMode::UserPresence => SecureSlot::new(&self.dedicated).arm(key, value)?,
        }
        Ok(true)
    }

    /// Read the value stored under `key`.
    ///
    /// Standard reads migrate a legacy-only key into the dedicated
    /// namespace first. Presence reads never migrate and return `""` for an
    /// absent key.
    ///
    /// # Errors
    ///
    /// - [`StorageError::ItemNotFound`] when a standard read finds the key
    ///   in neither namespace.
    /// - [`StorageError::MigrationFailed`] when the move from the legacy
    ///   namespace fails.
    pub fn get(&self, key: &str, mode: StorageMode) -> Result<String> {
        match mode {
            StorageMode::UserPresence => SecureSlot::new(&self.dedicated).read(key),
            StorageMode::Standard => {
                let outcome = MigrationPolicy::new(&self.legacy, &self.dedicated).reconcile(key)?;
                if !outcome.is_present() {
                    return Err(StorageError::ItemNotFound {
                        key: key.to_owned(),
                    });
                }
                Ok(self.dedicated.get(key)?.unwrap_or_default())
            }
        }
    }

    /// Remove `key` from both namespaces.
    ///
    /// Both removals are always attempted. Absent keys are not an error.
    ///
    /// # Errors
    ///
    /// [`StorageError::RemovalFailed`] if either removal fails; the other
    /// side has still been cleaned.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let legacy = self.legacy.remove(key);
        let dedicated = self.dedicated.remove(key);

        let failures: Vec<String> = [("legacy", legacy), ("dedicated", dedicated)]
            .into_iter()
            .filter_map(|(side, result)| result.err().map(|e| format!("{side}: {e}")))
            .collect();

        if !failures.is_empty() {
            let reason = failures.join("; ");
            tracing::warn!(key, reason = %reason, "removal failed");
            return Err(StorageError::RemovalFailed {
                key: key.to_owned(),
                reason,
            });
        }

        tracing::debug!(key, "removed key");
        Ok(true)
    }

    /// Remove every dedicated key, together with any legacy copy of those
    /// keys.
    ///
    /// Legacy copies go first. The first failed legacy removal aborts the
    /// call with the dedicated namespace untouched. Legacy-only keys are
    /// left alone.
    ///
    /// # Errors
    ///
    /// [`StorageError::ClearFailed`] for a failed listing, legacy removal,
    /// or dedicated wipe.
    pub fn clear(&self) -> Result<bool> {
        let keys = self
            .dedicated
            .list_keys()
            .map_err(|e| clear_failed(format!("listing dedicated keys: {e}")))?;

        for key in &keys {
            let in_legacy = self
                .legacy
                .contains(key)
                .map_err(|e| clear_failed(format!("checking legacy key {key}: {e}")))?;
            if in_legacy {
                self.legacy
                    .remove(key)
                    .map_err(|e| clear_failed(format!("removing legacy key {key}: {e}")))?;
            }
        }

        let removed = self
            .dedicated
            .remove_all()
            .map_err(|e| clear_failed(format!("wiping dedicated namespace: {e}")))?;

        tracing::info!(
            service = self.dedicated.service(),
            removed,
            "cleared dedicated namespace"
        );
        Ok(true)
    }

    /// Keys of the dedicated namespace. Keys that exist only in the legacy
    /// namespace are not listed until a standard read migrates them.
    ///
    /// Never fails: a listing error is logged and reported as no keys.
    pub fn keys(&self) -> Vec<String> {
        self.dedicated.list_keys().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "listing dedicated keys failed");
            Vec::new()
        })
    }

    /// Fixed platform identifier.
    pub fn platform(&self) -> &str {
        &self.platform
    }
}

fn clear_failed(reason: String) -> StorageError {
    tracing::warn!(reason = %reason, "clear failed");
    StorageError::ClearFailed { reason }
}
