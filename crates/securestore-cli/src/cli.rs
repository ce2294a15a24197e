//! CLI argument definitions for SecureStore.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SecureStore -- secure key-value storage over the platform credential store.
#[derive(Parser)]
#[command(
    name = "securestore",
    version,
    about = "SecureStore -- secure key-value storage",
    long_about = "Stores small string secrets in a dedicated credential namespace, \
                  migrating values left by older releases out of the legacy namespace \
                  on first read."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a value under a key.
    Set {
        key: String,
        value: String,

        /// `user_presence` gates the value behind a presence check and
        /// erases every other stored key. Anything else is a standard write.
        #[arg(long, default_value = "")]
        mode: String,
    },

    /// Read the value stored under a key.
    Get {
        key: String,

        /// `user_presence` reads the gated slot without migrating.
        #[arg(long, default_value = "")]
        mode: String,
    },

    /// Remove a key from both namespaces.
    Remove { key: String },

    /// Remove every stored key and its legacy copy.
    Clear,

    /// List stored keys.
    Keys,

    /// Print the platform identifier.
    Platform,

    /// Invoke a bridge method directly with a JSON options object.
    Call {
        /// Method name (`set`, `get`, `remove`, `clear`, `keys`, `getPlatform`).
        method: String,

        /// JSON options, e.g. `{"key":"token","value":"abc"}`.
        #[arg(default_value = "{}")]
        options: String,
    },

    /// Write a value into the legacy namespace, as an older release would.
    LegacySet { key: String, value: String },
}
