//! Move-on-read migration from the legacy namespace.
//!
//! Secrets written by older releases live under the shared legacy service
//! label. They are not bulk-migrated; instead the first standard read of a
//! key relocates it into the dedicated namespace. Until then the key stays
//! invisible to `keys()`.
//!
//! The move is copy-then-delete. A key already present in the dedicated
//! namespace is served from there and the legacy namespace is not touched,
//! so a read that fails between the two steps converges once the copy has
//! landed. Any legacy leftover is cleaned up by `remove` or `clear`.

use crate::error::{Result, StorageError};
use crate::namespace::Namespace;

/// What [`MigrationPolicy::reconcile`] found and did for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The key is in the dedicated namespace; nothing moved.
    Dedicated,
    /// The key was only in the legacy namespace and has been moved.
    Migrated,
    /// The key is in neither namespace.
    Absent,
}

impl MigrationOutcome {
    /// Whether the key is now readable from the dedicated namespace.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// Reconciles one key between the legacy and the dedicated namespace.
#[derive(Debug, Clone, Copy)]
pub struct MigrationPolicy<'a> {
    legacy: &'a Namespace,
    dedicated: &'a Namespace,
}

impl<'a> MigrationPolicy<'a> {
    pub fn new(legacy: &'a Namespace, dedicated: &'a Namespace) -> Self {
        Self { legacy, dedicated }
    }

    /// Make `key` readable from the dedicated namespace when it exists in
    /// either one. Only a legacy-only key is moved; a key already in the
    /// dedicated namespace leaves the legacy namespace untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MigrationFailed`] if the copy into the
    /// dedicated namespace or the legacy removal fails. A failed copy
    /// leaves the legacy entry untouched. Errors from the existence checks
    /// are returned as reported by the store.
    pub fn reconcile(&self, key: &str) -> Result<MigrationOutcome> {
        if self.dedicated.contains(key)? {
            return Ok(MigrationOutcome::Dedicated);
        }
        if !self.legacy.contains(key)? {
            return Ok(MigrationOutcome::Absent);
        }

        self.copy_to_dedicated(key)?;
        self.drop_legacy(key)?;
        tracing::info!(
            key,
            from = self.legacy.service(),
            to = self.dedicated.service(),
            "migrated key from legacy namespace"
        );
        Ok(MigrationOutcome::Migrated)
    }

    fn copy_to_dedicated(&self, key: &str) -> Result<()> {
        let value = self
            .legacy
            .get(key)
            .map_err(|e| migration_failed(key, format!("legacy read: {e}")))?
            .unwrap_or_default();

        self.dedicated
            .set(key, &value)
            .map_err(|e| migration_failed(key, format!("dedicated write: {e}")))
    }

    fn drop_legacy(&self, key: &str) -> Result<()> {
        self.legacy
            .remove(key)
            .map(|_| ())
            .map_err(|e| migration_failed(key, format!("legacy removal: {e}")))
    }
}

fn migration_failed(key: &str, reason: String) -> StorageError {
    tracing::warn!(key, reason = %reason, "migration step failed");
    StorageError::MigrationFailed {
        key: key.to_owned(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::CredentialStore;
    use crate::memory::MemoryStore;

    fn namespaces() -> (Namespace, Namespace) {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::new());
        (
            Namespace::new("legacy", store.clone()),
            Namespace::new("dedicated", store),
        )
    }

    #[test]
    fn legacy_only_key_is_moved() {
        let (legacy, dedicated) = namespaces();
        legacy.set("k", "v").unwrap();

        let outcome = MigrationPolicy::new(&legacy, &dedicated).reconcile("k").unwrap();

        assert_eq!(outcome, MigrationOutcome::Migrated);
        assert_eq!(dedicated.get("k").unwrap().as_deref(), Some("v"));
        assert!(!legacy.contains("k").unwrap());
    }

    #[test]
    fn second_reconcile_is_a_no_op() {
        let (legacy, dedicated) = namespaces();
        legacy.set("k", "v").unwrap();
        let policy = MigrationPolicy::new(&legacy, &dedicated);

        policy.reconcile("k").unwrap();
        assert_eq!(policy.reconcile("k").unwrap(), MigrationOutcome::Dedicated);
        assert_eq!(dedicated.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn dedicated_copy_wins_over_legacy() {
        let (legacy, dedicated) = namespaces();
        legacy.set("k", "old").unwrap();
        dedicated.set("k", "new").unwrap();

        let outcome = MigrationPolicy::new(&legacy, &dedicated).reconcile("k").unwrap();

        assert_eq!(outcome, MigrationOutcome::Dedicated);
        assert_eq!(dedicated.get("k").unwrap().as_deref(), Some("new"));
        assert_eq!(legacy.get("k").unwrap().as_deref(), Some("old"));
    }

    #[test]
    fn absent_key_reports_absent() {
        let (legacy, dedicated) = namespaces();
        let outcome = MigrationPolicy::new(&legacy, &dedicated)
            .reconcile("missing")
            .unwrap();
        assert_eq!(outcome, MigrationOutcome::Absent);
        assert!(!outcome.is_present());
    }
}
