//! Native credential store selection.
//!
//! On macOS items go to Keychain Services as generic passwords, where the
//! service label is `kSecAttrService` and the key is `kSecAttrAccount`.
//! Gated items are created with a `SecAccessControl` carrying the
//! user-presence flag, so the OS itself prompts for Touch ID or the login
//! password on read.
//!
//! Everywhere else [`platform_store`] falls back to the encrypted
//! [`SqliteStore`](crate::sqlite::SqliteStore).

use std::sync::Arc;

use crate::backend::CredentialStore;
use crate::config::{BackendKind, StorageConfig};
use crate::error::{Result, StorageError};
use crate::master_key::MasterKeyFile;
use crate::memory::MemoryStore;
use crate::presence::PresenceVerifier;
use crate::sqlite::SqliteStore;

// ---------------------------------------------------------------------------
// macOS Keychain Services
// ---------------------------------------------------------------------------

/// `errSecItemNotFound`.
#[cfg(target_os = "macos")]
const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;

/// `errSecUserCanceled`.
#[cfg(target_os = "macos")]
const ERR_SEC_USER_CANCELED: i32 = -128;

/// `errSecAuthFailed`.
#[cfg(target_os = "macos")]
const ERR_SEC_AUTH_FAILED: i32 = -25293;

/// Keychain Services backend.
#[cfg(target_os = "macos")]
#[derive(Debug, Default, Clone, Copy)]
pub struct KeychainStore;

#[cfg(target_os = "macos")]
impl KeychainStore {
    pub fn new() -> Self {
        Self
    }

    fn unavailable(op: &str, e: security_framework::base::Error) -> StorageError {
        StorageError::BackendUnavailable {
            reason: format!("keychain {op} failed: {e}"),
        }
    }
}

#[cfg(target_os = "macos")]
impl CredentialStore for KeychainStore {
    fn name(&self) -> &'static str {
        "keychain"
    }

    fn set(
        &self,
        service: &str,
        account: &str,
        value: &[u8],
        access: Option<crate::backend::AccessControl>,
    ) -> Result<()> {
        use security_framework::passwords::{set_generic_password, set_generic_password_options};
        use security_framework::passwords_options::{AccessControlOptions, PasswordOptions};

        match access {
            None => set_generic_password(service, account, value)
                .map_err(|e| Self::unavailable("write", e))?,
            Some(crate::backend::AccessControl::UserPresence) => {
                // Access control cannot be changed on an existing item.
                self.remove(service, account)?;
                let mut options = PasswordOptions::new_generic_password(service, account);
                options.set_access_control_options(AccessControlOptions::USER_PRESENCE);
                set_generic_password_options(value, options)
                    .map_err(|e| Self::unavailable("gated write", e))?;
            }
        }

        tracing::debug!(service, account, gated = access.is_some(), "stored keychain item");
        Ok(())
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>> {
        use security_framework::passwords::get_generic_password;

        match get_generic_password(service, account) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(None),
            Err(e) if e.code() == ERR_SEC_USER_CANCELED || e.code() == ERR_SEC_AUTH_FAILED => {
                Err(StorageError::AuthenticationFailed {
                    key: account.to_owned(),
                })
            }
            Err(e) => Err(Self::unavailable("read", e)),
        }
    }

    fn remove(&self, service: &str, account: &str) -> Result<bool> {
        use security_framework::passwords::delete_generic_password;

        match delete_generic_password(service, account) {
            Ok(()) => Ok(true),
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(false),
            Err(e) => Err(Self::unavailable("delete", e)),
        }
    }

    fn remove_all(&self, service: &str) -> Result<usize> {
        let mut removed = 0;
        for account in self.list_accounts(service)? {
            if self.remove(service, &account)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn list_accounts(&self, service: &str) -> Result<Vec<String>> {
        use security_framework::item::{ItemClass, ItemSearchOptions, Limit};

        let results = match ItemSearchOptions::new()
            .class(ItemClass::generic_password())
            .service(service)
            .load_attributes(true)
            .limit(Limit::All)
            .search()
        {
            Ok(results) => results,
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => return Ok(Vec::new()),
            Err(e) => return Err(Self::unavailable("search", e)),
        };

        let mut accounts: Vec<String> = results
            .iter()
            .filter_map(|r| r.simplify_dict())
            .filter_map(|attrs| attrs.get("acct").cloned())
            .collect();
        accounts.sort();
        Ok(accounts)
    }

    fn contains(&self, service: &str, account: &str) -> Result<bool> {
        // Attribute search only; reading the data would trigger a prompt.
        Ok(self
            .list_accounts(service)?
            .iter()
            .any(|existing| existing == account))
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build the credential store selected by `config`.
///
/// The SQLite backend loads (or creates) its master key from
/// `<data_dir>/master.key` and keeps items in `<data_dir>/securestore.db`.
pub fn platform_store(
    config: &StorageConfig,
    verifier: Arc<dyn PresenceVerifier>,
) -> Result<Arc<dyn CredentialStore>> {
    match config.backend {
        BackendKind::Memory => {
            tracing::info!("using in-memory credential store");
            Ok(Arc::new(MemoryStore::with_verifier(verifier)))
        }
        BackendKind::Sqlite => {
            std::fs::create_dir_all(&config.data_dir)?;
            let key_file = MasterKeyFile::new(MasterKeyFile::default_path(&config.data_dir));
            let master_key = key_file.load_or_create()?;
            let db_path = config.data_dir.join("securestore.db");
            tracing::info!(path = %db_path.display(), "using SQLite credential store");
            Ok(Arc::new(SqliteStore::open(db_path, &master_key, verifier)?))
        }
        BackendKind::Keychain => keychain_store(verifier),
    }
}

#[cfg(target_os = "macos")]
fn keychain_store(_verifier: Arc<dyn PresenceVerifier>) -> Result<Arc<dyn CredentialStore>> {
    tracing::info!("using macOS Keychain Services");
    Ok(Arc::new(KeychainStore::new()))
}

#[cfg(not(target_os = "macos"))]
fn keychain_store(_verifier: Arc<dyn PresenceVerifier>) -> Result<Arc<dyn CredentialStore>> {
    Err(StorageError::BackendUnavailable {
        reason: format!("no native keychain on {}", std::env::consts::OS),
    })
}
