//! The credential store abstraction.
//!
//! A [`CredentialStore`] is the platform's secure item store: opaque bytes
//! addressed by a `(service, account)` pair, with an optional access-control
//! requirement attached per item. Everything above this trait (namespaces,
//! migration, the presence slot) is backend-agnostic.
//!
//! Implementations:
//!
//! - [`MemoryStore`](crate::memory::MemoryStore): process-local, for tests
//!   and ephemeral use.
//! - [`SqliteStore`](crate::sqlite::SqliteStore): encrypted SQLite file.
//! - `KeychainStore`: macOS Keychain Services (macOS only).

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

/// Access-control requirement attached to a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessControl {
    /// The item is readable only while the device is unlocked and after a
    /// successful device-presence check (biometry or passcode).
    UserPresence,
}

impl AccessControl {
    /// Convert to the string stored on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserPresence => "user_presence",
        }
    }

    /// Parse from the string stored on disk.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user_presence" => Some(Self::UserPresence),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstraction over a platform secure item store.
///
/// Implementations must be `Send + Sync` so one store can back several
/// namespaces. Each method is atomic for the single item it touches; no
/// multi-item atomicity is promised.
pub trait CredentialStore: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Insert or replace the item at `(service, account)`.
    ///
    /// When `access` is `Some`, reads of the item are subject to that
    /// requirement.
    fn set(
        &self,
        service: &str,
        account: &str,
        value: &[u8],
        access: Option<AccessControl>,
    ) -> Result<()>;

    /// Read the item at `(service, account)`.
    ///
    /// Returns `Ok(None)` when no such item exists. Gated items may fail
    /// with [`StorageError::AuthenticationFailed`](crate::StorageError::AuthenticationFailed).
    fn get(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>>;

    /// Delete the item at `(service, account)`.
    ///
    /// Returns whether an item was removed; removing an absent item is not
    /// an error.
    fn remove(&self, service: &str, account: &str) -> Result<bool>;

    /// Delete every item under `service`. Returns the number removed.
    fn remove_all(&self, service: &str) -> Result<usize>;

    /// List the account names stored under `service`.
    fn list_accounts(&self, service: &str) -> Result<Vec<String>>;

    /// Check whether `(service, account)` exists without reading its value,
    /// so no presence check is triggered.
    fn contains(&self, service: &str, account: &str) -> Result<bool>;
}
