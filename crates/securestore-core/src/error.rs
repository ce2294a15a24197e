//! Storage error types.
//!
//! Every public API in this crate reports failures through [`StorageError`].
//! The facade-level variants name the operation step that failed so callers
//! can tell a broken migration apart from a rejected write; the backend-level
//! variants describe what the underlying credential store reported.

/// Unified error type for secure storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    // -- Facade errors ------------------------------------------------------
    /// The key is absent from both the dedicated and the legacy namespace.
    #[error("item with given key does not exist: {key}")]
    ItemNotFound { key: String },

    /// The credential store rejected a write.
    #[error("write failed for key {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    /// Moving a key from the legacy namespace into the dedicated one failed
    /// at the copy or at the legacy removal step.
    #[error("migration failed for key {key}: {reason}")]
    MigrationFailed { key: String, reason: String },

    /// Removing a key from one of the namespaces failed.
    #[error("removal failed for key {key}: {reason}")]
    RemovalFailed { key: String, reason: String },

    /// Clearing the namespaces failed part way through.
    #[error("clear failed: {reason}")]
    ClearFailed { reason: String },

    // -- Backend errors -----------------------------------------------------
    /// A presence-gated item was read but the device-presence check did not
    /// succeed.
    #[error("device presence authentication failed for key {key}")]
    AuthenticationFailed { key: String },

    /// The credential store could not be reached or is unsupported here.
    #[error("credential store unavailable: {reason}")]
    BackendUnavailable { reason: String },

    /// Encryption failed (e.g. invalid key length, ring internal error).
    #[error("encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    /// Decryption failed (e.g. wrong master key, corrupted ciphertext).
    #[error("decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    /// Deriving or unwrapping the master key failed.
    #[error("key derivation failed: {reason}")]
    KeyDerivationFailed { reason: String },

    /// A stored value is not valid UTF-8 and cannot be returned as a string.
    #[error("stored value for key {key} is not valid UTF-8")]
    InvalidValue { key: String },

    /// Creating or upgrading the on-disk item schema failed.
    #[error("schema setup failed: {reason}")]
    SchemaFailed { reason: String },

    // -- Configuration ------------------------------------------------------
    /// The storage configuration is malformed.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    // -- Underlying errors --------------------------------------------------
    /// SQLite error from `rusqlite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error from the filesystem.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // -- Generic ------------------------------------------------------------
    /// Catch-all for unexpected internal errors.
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StorageError>;
