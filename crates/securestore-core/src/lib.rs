//! Secure key-value storage over a platform credential store.
//!
//! Small string secrets are stored under string keys in a *dedicated*
//! service namespace. Secrets left behind by older releases in a shared
//! *legacy* namespace are moved over the first time they are read, and a
//! single secret can be parked behind a device-presence check.
//!
//! # Modules
//!
//! - [`facade`]: the public operations (`set`, `get`, `remove`, `clear`,
//!   `keys`, `platform`).
//! - [`migration`]: move-on-read from the legacy namespace.
//! - [`slot`]: the presence-gated secret slot.
//! - [`namespace`]: a credential store bound to one service label.
//! - [`backend`]: the [`CredentialStore`] trait and access control.
//! - [`memory`], [`sqlite`], [`keychain`]: store implementations and the
//!   [`platform_store`] factory.
//! - [`bridge`]: named-call dispatch with JSON payloads.
//! - [`config`]: TOML and environment configuration.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use securestore_core::{MemoryStore, SecureStorage, StorageError, StorageMode};
//!
//! # fn example() -> securestore_core::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let storage = SecureStorage::new(store, "SwiftKeychainWrapper", "cap_sec");
//!
//! // A secret written by an older release under the legacy label.
//! storage.legacy().set("session", "abc")?;
//! assert!(storage.keys().is_empty());
//!
//! // The first read moves it into the dedicated namespace.
//! assert_eq!(storage.get("session", StorageMode::Standard)?, "abc");
//! assert_eq!(storage.keys(), vec!["session".to_string()]);
//!
//! assert!(matches!(
//!     storage.get("missing", StorageMode::Standard),
//!     Err(StorageError::ItemNotFound { .. })
//! ));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod backend;
pub mod bridge;
pub mod config;
pub mod crypto;
pub mod error;
pub mod facade;
pub mod keychain;
pub mod master_key;
pub mod memory;
pub mod migration;
pub mod mode;
pub mod namespace;
pub mod presence;
pub mod slot;
pub mod sqlite;

pub use backend::{AccessControl, CredentialStore};
pub use bridge::{CallError, CallResult, dispatch};
pub use config::{BackendKind, PresencePolicy, StorageConfig};
pub use error::{Result, StorageError};
pub use facade::SecureStorage;
pub use keychain::platform_store;
pub use memory::MemoryStore;
pub use mode::StorageMode;
pub use namespace::Namespace;
pub use presence::{AllowPresence, DenyPresence, PresenceVerifier};
pub use sqlite::SqliteStore;
