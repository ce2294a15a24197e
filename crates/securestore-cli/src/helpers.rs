//! Shared helpers for the CLI: tracing setup, presence prompting and
//! storage construction.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use securestore_core::{
    AllowPresence, DenyPresence, PresencePolicy, PresenceVerifier, SecureStorage,
    StorageConfig, platform_store,
};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialise the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies. Output goes
/// to stderr so stdout carries only call results.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Asks for confirmation on the controlling terminal.
pub struct TerminalPresence;

impl PresenceVerifier for TerminalPresence {
    fn verify(&self, reason: &str) -> securestore_core::Result<bool> {
        eprint!("{reason} [y/N] ");
        io::stderr().flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;

        Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
    }
}

fn verifier_for(policy: PresencePolicy) -> Arc<dyn PresenceVerifier> {
    match policy {
        PresencePolicy::Prompt => Arc::new(TerminalPresence),
        PresencePolicy::Allow => Arc::new(AllowPresence),
        PresencePolicy::Deny => Arc::new(DenyPresence),
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Load configuration from `config_path` and the environment, then open the
/// configured credential store.
pub fn open_storage(config_path: &Path) -> Result<SecureStorage> {
    let config = StorageConfig::load(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    tracing::debug!(
        backend = config.backend.as_str(),
        legacy = %config.legacy_service,
        dedicated = %config.dedicated_service,
        "opening storage"
    );

    let store = platform_store(&config, verifier_for(config.presence))
        .with_context(|| format!("failed to open {} backend", config.backend.as_str()))?;

    Ok(SecureStorage::from_config(store, &config))
}
