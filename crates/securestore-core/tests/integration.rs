//! Integration tests for securestore-core.
//!
//! These exercise the public operations end to end over the memory and
//! SQLite backends, including partial failures injected into individual
//! store operations.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use securestore_core::{
    AccessControl, AllowPresence, CredentialStore, DenyPresence, MemoryStore, Result,
    SecureStorage, SqliteStore, StorageError, StorageMode, crypto, dispatch,
};
use serde_json::json;

const LEGACY: &str = "SwiftKeychainWrapper";
const DEDICATED: &str = "cap_sec";

// ═══════════════════════════════════════════════════════════════════════
//  Fault injection
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Set,
    Remove,
    RemoveAll,
}

/// Memory store that fails selected operations on selected services.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<(Op, &'static str)>>,
}

impl FlakyStore {
    fn fail(&self, op: Op, service: &'static str) {
        self.failing.lock().unwrap().insert((op, service));
    }

    fn check(&self, op: Op, service: &str) -> Result<()> {
        if self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|(o, s)| *o == op && *s == service)
        {
            return Err(StorageError::BackendUnavailable {
                reason: format!("injected {op:?} failure on {service}"),
            });
        }
        Ok(())
    }
}

impl CredentialStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn set(
        &self,
        service: &str,
        account: &str,
        value: &[u8],
        access: Option<AccessControl>,
    ) -> Result<()> {
        self.check(Op::Set, service)?;
        self.inner.set(service, account, value, access)
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(service, account)
    }

    fn remove(&self, service: &str, account: &str) -> Result<bool> {
        self.check(Op::Remove, service)?;
        self.inner.remove(service, account)
    }

    fn remove_all(&self, service: &str) -> Result<usize> {
        self.check(Op::RemoveAll, service)?;
        self.inner.remove_all(service)
    }

    fn list_accounts(&self, service: &str) -> Result<Vec<String>> {
        self.inner.list_accounts(service)
    }

    fn contains(&self, service: &str, account: &str) -> Result<bool> {
        self.inner.contains(service, account)
    }
}

fn flaky_storage() -> (Arc<FlakyStore>, SecureStorage) {
    let store = Arc::new(FlakyStore::default());
    let storage = SecureStorage::new(store.clone(), LEGACY, DEDICATED);
    (store, storage)
}

fn memory_storage() -> SecureStorage {
    SecureStorage::new(Arc::new(MemoryStore::new()), LEGACY, DEDICATED)
}

// ═══════════════════════════════════════════════════════════════════════
//  Core properties
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn move_on_read_relocates_legacy_key_once() {
    let storage = memory_storage();
    storage.legacy().set("k", "v").unwrap();

    // Invisible until read.
    assert!(!storage.keys().contains(&"k".to_string()));

    assert_eq!(storage.get("k", StorageMode::Standard).unwrap(), "v");
    assert_eq!(storage.dedicated().get("k").unwrap().as_deref(), Some("v"));
    assert!(!storage.legacy().contains("k").unwrap());
    assert_eq!(storage.keys(), vec!["k"]);

    // Second read is served from the dedicated namespace.
    assert_eq!(storage.get("k", StorageMode::Standard).unwrap(), "v");
    assert!(!storage.legacy().contains("k").unwrap());
}

#[test]
fn arming_presence_slot_wipes_dedicated() {
    let store = Arc::new(MemoryStore::new());
    let storage = SecureStorage::new(store.clone(), LEGACY, DEDICATED);
    storage.set("a", "1", StorageMode::Standard).unwrap();
    storage.set("b", "2", StorageMode::Standard).unwrap();
    storage.legacy().set("c", "3").unwrap();

    assert!(storage.set("secret", "s", StorageMode::UserPresence).unwrap());

    assert_eq!(storage.keys(), vec!["secret"]);
    assert_eq!(
        store.access_control(DEDICATED, "secret"),
        Some(AccessControl::UserPresence)
    );
    // The legacy namespace is not part of the slot.
    assert!(storage.legacy().contains("c").unwrap());
    assert_eq!(storage.get("secret", StorageMode::UserPresence).unwrap(), "s");
}

#[test]
fn standard_read_of_dedicated_key_leaves_legacy_alone() {
    let storage = memory_storage();
    storage.dedicated().set("k", "new").unwrap();
    storage.legacy().set("k", "old").unwrap();

    assert_eq!(storage.get("k", StorageMode::Standard).unwrap(), "new");
    assert!(storage.legacy().contains("k").unwrap());

    // The leftover goes away with an explicit remove.
    assert!(storage.remove("k").unwrap());
    assert!(!storage.legacy().contains("k").unwrap());
}

#[test]
fn clear_mirrors_legacy_cleanup() {
    let storage = memory_storage();
    storage.dedicated().set("a", "1").unwrap();
    storage.legacy().set("a", "old").unwrap();

    assert!(storage.clear().unwrap());

    assert!(!storage.dedicated().contains("a").unwrap());
    assert!(!storage.legacy().contains("a").unwrap());
    assert!(storage.keys().is_empty());
}

#[test]
fn remove_cleans_both_namespaces() {
    let storage = memory_storage();
    storage.dedicated().set("k", "new").unwrap();
    storage.legacy().set("k", "old").unwrap();

    assert!(storage.remove("k").unwrap());

    assert!(matches!(
        storage.get("k", StorageMode::Standard),
        Err(StorageError::ItemNotFound { .. })
    ));
}

// ═══════════════════════════════════════════════════════════════════════
//  Partial failures
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn failed_legacy_removal_during_get_is_migration_failure() {
    let (store, storage) = flaky_storage();
    storage.legacy().set("k", "v").unwrap();
    store.fail(Op::Remove, LEGACY);

    let result = storage.get("k", StorageMode::Standard);
    assert!(matches!(result, Err(StorageError::MigrationFailed { .. })));

    // The copy landed; the dedicated value is readable.
    assert_eq!(storage.dedicated().get("k").unwrap().as_deref(), Some("v"));
    assert!(storage.legacy().contains("k").unwrap());

    // The retry is served from the dedicated copy even while the legacy
    // removal keeps failing.
    assert_eq!(storage.get("k", StorageMode::Standard).unwrap(), "v");
    assert!(storage.legacy().contains("k").unwrap());
}

#[test]
fn dedicated_value_readable_when_legacy_copy_cannot_be_removed() {
    let (store, storage) = flaky_storage();
    storage.dedicated().set("k", "new").unwrap();
    storage.legacy().set("k", "old").unwrap();
    store.fail(Op::Remove, LEGACY);

    assert_eq!(storage.get("k", StorageMode::Standard).unwrap(), "new");
    assert_eq!(storage.legacy().get("k").unwrap().as_deref(), Some("old"));
}

#[test]
fn failed_copy_leaves_legacy_intact() {
    let (store, storage) = flaky_storage();
    storage.legacy().set("k", "v").unwrap();
    store.fail(Op::Set, DEDICATED);

    let result = storage.get("k", StorageMode::Standard);
    assert!(matches!(result, Err(StorageError::MigrationFailed { .. })));

    assert!(storage.legacy().contains("k").unwrap());
    assert!(!storage.dedicated().contains("k").unwrap());
}

#[test]
fn standard_write_failure_is_reported() {
    let (store, storage) = flaky_storage();
    store.fail(Op::Set, DEDICATED);

    let result = storage.set("k", "v", StorageMode::Standard);
    assert!(matches!(result, Err(StorageError::WriteFailed { .. })));
}

#[test]
fn failed_gated_write_keeps_the_wipe() {
    let (store, storage) = flaky_storage();
    storage.set("a", "1", StorageMode::Standard).unwrap();
    store.fail(Op::Set, DEDICATED);

    let result = storage.set("secret", "s", StorageMode::UserPresence);
    assert!(matches!(result, Err(StorageError::WriteFailed { .. })));

    // No rollback: the earlier entry is gone and no secret was written.
    assert!(storage.keys().is_empty());
}

#[test]
fn failed_wipe_prevents_gated_write() {
    let (store, storage) = flaky_storage();
    storage.set("a", "1", StorageMode::Standard).unwrap();
    store.fail(Op::RemoveAll, DEDICATED);

    let result = storage.set("secret", "s", StorageMode::UserPresence);
    assert!(matches!(result, Err(StorageError::WriteFailed { .. })));
    assert_eq!(storage.keys(), vec!["a"]);
}

#[test]
fn failed_legacy_removal_in_remove_still_cleans_dedicated() {
    let (store, storage) = flaky_storage();
    storage.set("k", "v", StorageMode::Standard).unwrap();
    storage.legacy().set("k", "old").unwrap();
    store.fail(Op::Remove, LEGACY);

    let result = storage.remove("k");
    assert!(matches!(result, Err(StorageError::RemovalFailed { .. })));

    assert!(!storage.dedicated().contains("k").unwrap());
    assert!(storage.legacy().contains("k").unwrap());
}

#[test]
fn failed_legacy_cleanup_in_clear_leaves_dedicated_intact() {
    let (store, storage) = flaky_storage();
    storage.set("a", "1", StorageMode::Standard).unwrap();
    storage.set("b", "2", StorageMode::Standard).unwrap();
    storage.legacy().set("a", "old").unwrap();
    store.fail(Op::Remove, LEGACY);

    let result = storage.clear();
    assert!(matches!(result, Err(StorageError::ClearFailed { .. })));

    assert_eq!(storage.keys(), vec!["a", "b"]);
    assert!(storage.legacy().contains("a").unwrap());
}

#[test]
fn failed_dedicated_wipe_in_clear() {
    let (store, storage) = flaky_storage();
    storage.set("a", "1", StorageMode::Standard).unwrap();
    storage.legacy().set("a", "old").unwrap();
    store.fail(Op::RemoveAll, DEDICATED);

    let result = storage.clear();
    assert!(matches!(result, Err(StorageError::ClearFailed { .. })));

    // Legacy cleanup already happened.
    assert!(!storage.legacy().contains("a").unwrap());
    assert_eq!(storage.keys(), vec!["a"]);
}

// ═══════════════════════════════════════════════════════════════════════
//  SQLite backend
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn sqlite_backed_storage_migrates_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("securestore.db");
    let key = crypto::random_bytes(crypto::KEY_LEN).unwrap();

    {
        let store = Arc::new(SqliteStore::open(&path, &key, Arc::new(AllowPresence)).unwrap());
        let storage = SecureStorage::new(store, LEGACY, DEDICATED);
        storage.legacy().set("session", "abc").unwrap();
        assert_eq!(storage.get("session", StorageMode::Standard).unwrap(), "abc");
    }

    let store = Arc::new(SqliteStore::open(&path, &key, Arc::new(AllowPresence)).unwrap());
    let storage = SecureStorage::new(store, LEGACY, DEDICATED);
    assert_eq!(storage.keys(), vec!["session"]);
    assert!(!storage.legacy().contains("session").unwrap());
}

#[test]
fn sqlite_presence_denied_surfaces_authentication_failure() {
    let key = crypto::random_bytes(crypto::KEY_LEN).unwrap();
    let store = Arc::new(SqliteStore::open_in_memory(&key, Arc::new(DenyPresence)).unwrap());
    let storage = SecureStorage::new(store, LEGACY, DEDICATED);

    storage.set("pin", "1234", StorageMode::UserPresence).unwrap();

    assert!(matches!(
        storage.get("pin", StorageMode::UserPresence),
        Err(StorageError::AuthenticationFailed { .. })
    ));
    // Absence is still lenient.
    assert_eq!(storage.get("other", StorageMode::UserPresence).unwrap(), "");
}

// ═══════════════════════════════════════════════════════════════════════
//  Bridge
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn bridge_surfaces_migration_failure_code() {
    let (store, storage) = flaky_storage();
    storage.legacy().set("k", "v").unwrap();
    store.fail(Op::Remove, LEGACY);

    let err = dispatch(&storage, "get", &json!({"key": "k"})).unwrap_err();
    assert_eq!(err.code, "MIGRATION_FAILED");
}

#[test]
fn bridge_full_session() {
    let storage = memory_storage().with_platform("ios");

    dispatch(&storage, "set", &json!({"key": "a", "value": "1", "mode": ""})).unwrap();
    dispatch(&storage, "set", &json!({"key": "b", "value": "2"})).unwrap();
    assert_eq!(
        dispatch(&storage, "keys", &json!({})).unwrap(),
        json!({"value": ["a", "b"]})
    );

    assert_eq!(
        dispatch(&storage, "remove", &json!({"key": "a"})).unwrap(),
        json!({"value": true})
    );
    assert_eq!(
        dispatch(&storage, "get", &json!({"key": "b", "mode": "standard"})).unwrap(),
        json!({"value": "2"})
    );
    assert_eq!(
        dispatch(&storage, "getPlatform", &json!({})).unwrap(),
        json!({"value": "ios"})
    );
}
