//! Named-call dispatch for host bridges.
//!
//! Hosts that expose storage as an RPC-style surface (a plugin bridge, a
//! CLI, a webview) hand over a method name and a JSON options object;
//! [`dispatch`] extracts the arguments, runs the operation and wraps the
//! result as `{"value": ...}`. Failures become a serializable
//! [`CallError`].
//!
//! Argument extraction is lenient: a missing or non-string `key`, `value`
//! or `mode` is treated as the empty string.

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::StorageError;
use crate::facade::SecureStorage;
use crate::mode::StorageMode;

/// Serializable failure returned to the caller of a bridged method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallError {
    pub code: String,
    pub message: String,
}

impl CallError {
    fn unknown_method(method: &str) -> Self {
        Self {
            code: "UNKNOWN_METHOD".to_string(),
            message: format!("method `{method}` is not implemented"),
        }
    }
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CallError {}

impl From<StorageError> for CallError {
    fn from(error: StorageError) -> Self {
        let code = match &error {
            StorageError::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            StorageError::WriteFailed { .. } => "WRITE_FAILED",
            StorageError::MigrationFailed { .. } => "MIGRATION_FAILED",
            StorageError::RemovalFailed { .. } => "REMOVAL_FAILED",
            StorageError::ClearFailed { .. } => "CLEAR_FAILED",
            StorageError::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            _ => "STORAGE_ERROR",
        };

        CallError {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type of a bridged call.
pub type CallResult = std::result::Result<Value, CallError>;

/// Run the storage operation named `method` with `options`.
pub fn dispatch(storage: &SecureStorage, method: &str, options: &Value) -> CallResult {
    tracing::debug!(method, "dispatching call");

    let value = match method {
        "set" => {
            let mode = mode_arg(options);
            json!(storage.set(&string_arg(options, "key"), &string_arg(options, "value"), mode)?)
        }
        "get" => json!(storage.get(&string_arg(options, "key"), mode_arg(options))?),
        "remove" => json!(storage.remove(&string_arg(options, "key"))?),
        "clear" => json!(storage.clear()?),
        "keys" => json!(storage.keys()),
        "getPlatform" => json!(storage.platform()),
        other => {
            tracing::warn!(method = other, "unknown method");
            return Err(CallError::unknown_method(other));
        }
    };

    Ok(json!({ "value": value }))
}

/// String argument `name`, or `""` when missing or not a string.
fn string_arg(options: &Value, name: &str) -> String {
    options
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn mode_arg(options: &Value) -> StorageMode {
    StorageMode::from_arg(&string_arg(options, "mode"))
}
