//! A credential store bound to one service label.

use std::sync::Arc;

use crate::backend::{AccessControl, CredentialStore};
use crate::error::{Result, StorageError};

/// String-valued view of a single service inside a [`CredentialStore`].
///
/// Values are stored as UTF-8 bytes. Cloning is cheap; clones share the
/// underlying store.
#[derive(Clone)]
pub struct Namespace {
    service: String,
    store: Arc<dyn CredentialStore>,
}

impl Namespace {
    pub fn new(service: impl Into<String>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            service: service.into(),
            store,
        }
    }

    /// The service label this namespace is bound to.
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(&self.service, key, value.as_bytes(), None)
    }

    /// Store `value` with an access-control requirement attached.
    pub fn set_with_access(&self, key: &str, value: &str, access: AccessControl) -> Result<()> {
        self.store
            .set(&self.service, key, value.as_bytes(), Some(access))
    }

    /// Read `key` as a string; `Ok(None)` when absent.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        match self.store.get(&self.service, key)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StorageError::InvalidValue {
                    key: key.to_owned(),
                }),
            None => Ok(None),
        }
    }

    /// Remove `key`. Absent keys are not an error; the flag reports whether
    /// anything was deleted.
    pub fn remove(&self, key: &str) -> Result<bool> {
        self.store.remove(&self.service, key)
    }

    pub fn remove_all(&self) -> Result<usize> {
        self.store.remove_all(&self.service)
    }

    pub fn list_keys(&self) -> Result<Vec<String>> {
        self.store.list_accounts(&self.service)
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        self.store.contains(&self.service, key)
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("service", &self.service)
            .field("backend", &self.store.name())
            .finish()
    }
}
