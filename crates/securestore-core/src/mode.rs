//! Storage modes accepted by `set` and `get`.

use serde::{Deserialize, Serialize};

/// How a value is written or read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Plain keyed storage in the dedicated namespace, with move-on-read
    /// migration from the legacy namespace.
    #[default]
    Standard,
    /// The single presence-gated slot. Arming it wipes the dedicated
    /// namespace; reading an absent key yields an empty string.
    UserPresence,
}

impl StorageMode {
    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::UserPresence => "user_presence",
        }
    }

    /// Parse a mode argument as sent by callers.
    ///
    /// Only `"user_presence"` selects the gated slot. Every other value,
    /// including the empty string, falls back to [`StorageMode::Standard`].
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "user_presence" => Self::UserPresence,
            _ => Self::Standard,
        }
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
