//! Process-local credential store.
//!
//! [`MemoryStore`] keeps items in a [`DashMap`] keyed by `(service,
//! account)`. Nothing is persisted. It is the backend used by tests and by
//! hosts that only need a scratch store for the lifetime of one process.

use std::sync::Arc;

use dashmap::DashMap;

use crate::backend::{AccessControl, CredentialStore};
use crate::error::{Result, StorageError};
use crate::presence::PresenceVerifier;

#[derive(Debug, Clone)]
struct MemoryItem {
    value: Vec<u8>,
    access: Option<AccessControl>,
}

/// In-memory credential store.
///
/// Gated items are released only after the configured [`PresenceVerifier`]
/// approves. Without a verifier, access control is recorded but not
/// enforced.
#[derive(Clone, Default)]
pub struct MemoryStore {
    items: Arc<DashMap<(String, String), MemoryItem>>,
    verifier: Option<Arc<dyn PresenceVerifier>>,
}

impl MemoryStore {
    /// Create an empty store that does not enforce access control.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that asks `verifier` before releasing gated
    /// items.
    #[must_use]
    pub fn with_verifier(verifier: Arc<dyn PresenceVerifier>) -> Self {
        Self {
            items: Arc::new(DashMap::new()),
            verifier: Some(verifier),
        }
    }

    /// Access-control requirement recorded for an item, if it exists.
    pub fn access_control(&self, service: &str, account: &str) -> Option<AccessControl> {
        self.items
            .get(&(service.to_owned(), account.to_owned()))
            .and_then(|item| item.access)
    }
}

impl CredentialStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn set(
        &self,
        service: &str,
        account: &str,
        value: &[u8],
        access: Option<AccessControl>,
    ) -> Result<()> {
        self.items.insert(
            (service.to_owned(), account.to_owned()),
            MemoryItem {
                value: value.to_vec(),
                access,
            },
        );
        tracing::trace!(service, account, gated = access.is_some(), "memory item set");
        Ok(())
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>> {
        // Clone out before verifying so no shard lock is held across the
        // verifier call.
        let item = match self.items.get(&(service.to_owned(), account.to_owned())) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };

        if let (Some(access), Some(verifier)) = (item.access, &self.verifier) {
            let reason = format!("Unlock {account} ({access})");
            if !verifier.verify(&reason)? {
                return Err(StorageError::AuthenticationFailed {
                    key: account.to_owned(),
                });
            }
        }

        Ok(Some(item.value))
    }

    fn remove(&self, service: &str, account: &str) -> Result<bool> {
        Ok(self
            .items
            .remove(&(service.to_owned(), account.to_owned()))
            .is_some())
    }

    fn remove_all(&self, service: &str) -> Result<usize> {
        let mut removed = 0usize;
        self.items.retain(|(item_service, _), _| {
            if item_service == service {
                removed += 1;
                false
            } else {
                true
            }
        });
        tracing::trace!(service, removed, "memory namespace cleared");
        Ok(removed)
    }

    fn list_accounts(&self, service: &str) -> Result<Vec<String>> {
        let mut accounts: Vec<String> = self
            .items
            .iter()
            .filter(|entry| entry.key().0 == service)
            .map(|entry| entry.key().1.clone())
            .collect();
        accounts.sort();
        Ok(accounts)
    }

    fn contains(&self, service: &str, account: &str) -> Result<bool> {
        Ok(self
            .items
            .contains_key(&(service.to_owned(), account.to_owned())))
    }
}
