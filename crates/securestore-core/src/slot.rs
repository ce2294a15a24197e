//! The presence-gated secret slot.
//!
//! The slot is not a separate store: it is one access-controlled entry in
//! the dedicated namespace. Arming it first erases every entry of that
//! namespace, gated or not, so at most one gated secret exists at a time.
//! A failed write after the erase is not rolled back.

use crate::backend::AccessControl;
use crate::error::{Result, StorageError};
use crate::namespace::Namespace;

/// Single-secret, presence-gated view of the dedicated namespace.
#[derive(Debug, Clone, Copy)]
pub struct SecureSlot<'a> {
    dedicated: &'a Namespace,
}

impl<'a> SecureSlot<'a> {
    pub fn new(dedicated: &'a Namespace) -> Self {
        Self { dedicated }
    }

    /// Wipe the dedicated namespace, then store `value` under `key` behind
    /// a user-presence requirement.
    ///
    /// # Errors
    ///
    /// [`StorageError::WriteFailed`] if either the wipe or the gated write
    /// fails. When the gated write fails the wipe has already happened.
    pub fn arm(&self, key: &str, value: &str) -> Result<()> {
        let evicted = self.dedicated.remove_all().map_err(|e| write_failed(key, e))?;
        if evicted > 0 {
            tracing::info!(
                service = self.dedicated.service(),
                evicted,
                "evicted dedicated entries to arm presence slot"
            );
        }

        self.dedicated
            .set_with_access(key, value, AccessControl::UserPresence)
            .map_err(|e| write_failed(key, e))?;

        tracing::info!(key, "presence slot armed");
        Ok(())
    }

    /// Read `key` from the dedicated namespace. An absent key, or a stored
    /// value that is not valid UTF-8, reads as the empty string.
    ///
    /// # Errors
    ///
    /// Other store errors are passed through, including
    /// [`StorageError::AuthenticationFailed`] when the presence check is
    /// refused.
    pub fn read(&self, key: &str) -> Result<String> {
        match self.dedicated.get(key) {
            Ok(value) => Ok(value.unwrap_or_default()),
            Err(StorageError::InvalidValue { .. }) => {
                tracing::debug!(key, "gated value is not UTF-8, reading as empty");
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }
}

fn write_failed(key: &str, err: StorageError) -> StorageError {
    tracing::warn!(key, error = %err, "presence slot write failed");
    StorageError::WriteFailed {
        key: key.to_owned(),
        reason: err.to_string(),
    }
}
