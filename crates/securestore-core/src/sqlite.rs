//! SQLite-backed encrypted credential store.
//!
//! [`SqliteStore`] is the cross-platform fallback for hosts without a
//! native keychain. Items live in a single `items` table keyed by
//! `(service, account)`; values are sealed with AES-256-GCM under the
//! master key before they are written, with the item address bound in as
//! associated data.
//!
//! Gated items carry their access-control requirement in the
//! `access_control` column; reading one asks the configured
//! [`PresenceVerifier`] first.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::backend::{AccessControl, CredentialStore};
use crate::crypto;
use crate::error::{Result, StorageError};
use crate::presence::PresenceVerifier;

/// Encrypted item store backed by SQLite.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    master_key: Vec<u8>,
    verifier: Arc<dyn PresenceVerifier>,
}

impl SqliteStore {
    /// Open (or create) the item database at `path`.
    ///
    /// The schema is created on first open.
    pub fn open(
        path: impl AsRef<Path>,
        master_key: &[u8],
        verifier: Arc<dyn PresenceVerifier>,
    ) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "opening item database");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn, master_key, verifier)
    }

    /// Open an in-memory store (useful for testing).
    pub fn open_in_memory(master_key: &[u8], verifier: Arc<dyn PresenceVerifier>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, master_key, verifier)
    }

    fn from_connection(
        conn: Connection,
        master_key: &[u8],
        verifier: Arc<dyn PresenceVerifier>,
    ) -> Result<Self> {
        if master_key.len() != crypto::KEY_LEN {
            return Err(StorageError::Config {
                reason: format!(
                    "master key must be {} bytes, got {}",
                    crypto::KEY_LEN,
                    master_key.len()
                ),
            });
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA secure_delete = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS items (
                service        TEXT NOT NULL,
                account        TEXT NOT NULL,
                data           BLOB NOT NULL,
                nonce          BLOB NOT NULL,
                access_control TEXT CHECK(access_control IS NULL OR access_control IN ('user_presence')),
                created_at     INTEGER NOT NULL,
                updated_at     INTEGER NOT NULL,
                PRIMARY KEY (service, account)
            );",
        )
        .map_err(|e| StorageError::SchemaFailed {
            reason: e.to_string(),
        })?;

        tracing::debug!("item database ready");
        Ok(Self {
            conn: Mutex::new(conn),
            master_key: master_key.to_vec(),
            verifier,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Internal(format!("item database lock poisoned: {e}")))
    }
}

impl CredentialStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn set(
        &self,
        service: &str,
        account: &str,
        value: &[u8],
        access: Option<AccessControl>,
    ) -> Result<()> {
        let aad = crypto::item_aad(service, account);
        let (nonce, ciphertext) = crypto::seal(value, &self.master_key, &aad)?;
        let now = Utc::now().timestamp();

        self.lock()?.execute(
            "INSERT INTO items (service, account, data, nonce, access_control, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(service, account) DO UPDATE SET
                data = excluded.data,
                nonce = excluded.nonce,
                access_control = excluded.access_control,
                updated_at = excluded.updated_at",
            params![
                service,
                account,
                ciphertext,
                nonce.as_slice(),
                access.map(|a| a.as_str()),
                now,
            ],
        )?;

        tracing::debug!(service, account, gated = access.is_some(), "stored item");
        Ok(())
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>> {
        let row = self
            .lock()?
            .query_row(
                "SELECT data, nonce, access_control FROM items
                 WHERE service = ?1 AND account = ?2",
                params![service, account],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((data, nonce, access)) = row else {
            return Ok(None);
        };

        if let Some(access) = access {
            let access = AccessControl::parse(&access).ok_or_else(|| {
                StorageError::Internal(format!("unknown access control `{access}`"))
            })?;
            let reason = format!("Unlock {account} ({access})");
            if !self.verifier.verify(&reason)? {
                tracing::warn!(service, account, "presence check failed");
                return Err(StorageError::AuthenticationFailed {
                    key: account.to_owned(),
                });
            }
        }

        let aad = crypto::item_aad(service, account);
        crypto::open(&nonce, &data, &self.master_key, &aad).map(Some)
    }

    fn remove(&self, service: &str, account: &str) -> Result<bool> {
        let rows = self.lock()?.execute(
            "DELETE FROM items WHERE service = ?1 AND account = ?2",
            params![service, account],
        )?;
        if rows > 0 {
            tracing::debug!(service, account, "removed item");
        }
        Ok(rows > 0)
    }

    fn remove_all(&self, service: &str) -> Result<usize> {
        let rows = self
            .lock()?
            .execute("DELETE FROM items WHERE service = ?1", params![service])?;
        tracing::debug!(service, removed = rows, "removed all items");
        Ok(rows)
    }

    fn list_accounts(&self, service: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT account FROM items WHERE service = ?1 ORDER BY account")?;
        let accounts = stmt
            .query_map(params![service], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    fn contains(&self, service: &str, account: &str) -> Result<bool> {
        let exists: bool = self.lock()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM items WHERE service = ?1 AND account = ?2)",
            params![service, account],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}
