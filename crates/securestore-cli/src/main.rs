//! CLI entry point for SecureStore.
//!
//! This binary provides the `securestore` command. Every subcommand is
//! routed through the same named-call dispatch a host bridge would use, so
//! results and failures have the bridge's JSON shape.

mod cli;
mod helpers;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Value, json};

use cli::{Cli, Commands};
use securestore_core::{SecureStorage, dispatch};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    helpers::init_tracing("warn");

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "securestore failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let storage = helpers::open_storage(&cli.config)?;

    let (method, options) = match cli.command {
        Commands::Set { key, value, mode } => {
            ("set".to_string(), json!({ "key": key, "value": value, "mode": mode }))
        }
        Commands::Get { key, mode } => ("get".to_string(), json!({ "key": key, "mode": mode })),
        Commands::Remove { key } => ("remove".to_string(), json!({ "key": key })),
        Commands::Clear => ("clear".to_string(), json!({})),
        Commands::Keys => ("keys".to_string(), json!({})),
        Commands::Platform => ("getPlatform".to_string(), json!({})),
        Commands::Call { method, options } => {
            let options: Value = serde_json::from_str(&options)
                .with_context(|| format!("invalid JSON options for `{method}`"))?;
            (method, options)
        }
        Commands::LegacySet { key, value } => return cmd_legacy_set(&storage, &key, &value),
    };

    Ok(print_call(&storage, &method, &options))
}

// ---------------------------------------------------------------------------
// Subcommand: call
// ---------------------------------------------------------------------------

fn print_call(storage: &SecureStorage, method: &str, options: &Value) -> ExitCode {
    match dispatch(storage, method, options) {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            match serde_json::to_string(&err) {
                Ok(body) => eprintln!("{body}"),
                Err(_) => eprintln!("{err}"),
            }
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand: legacy-set
// ---------------------------------------------------------------------------

fn cmd_legacy_set(storage: &SecureStorage, key: &str, value: &str) -> Result<ExitCode> {
    storage
        .legacy()
        .set(key, value)
        .with_context(|| format!("failed to write legacy key `{key}`"))?;

    tracing::info!(key, service = storage.legacy().service(), "seeded legacy key");
    println!("{}", json!({ "value": true }));
    Ok(ExitCode::SUCCESS)
}
