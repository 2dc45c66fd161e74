//! # castle-cli — Operator CLI for the Castle Escrow Stack
//!
//! Drives the deal lifecycle engine against a JSON document from the
//! command line. Every command prints its result as pretty JSON.
//!
//! ## Subcommands
//!
//! - `castle deal` — create, show, list, preview, join, decline, cancel,
//!   ship and receive deals.
//! - `castle account` — show, credit and register accounts.
//!
//! ```bash
//! export CASTLE_OPERATOR_ID=6828395702
//! castle deal create --seller 1 --type NFT --name "Plush Pepe" --description "Rare" --price 100
//! castle account credit 2 150 --actor 6828395702
//! castle deal join '#K40213' --buyer 2
//! ```

pub mod account;
pub mod deal;

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use castle_core::UserId;
use castle_engine::{DealLifecycleEngine, EngineConfig};

/// Build the engine configuration. Flags take precedence over the
/// `CASTLE_DATA_FILE` and `CASTLE_OPERATOR_ID` environment variables.
pub fn resolve_config(
    data_file: Option<PathBuf>,
    operator: Option<UserId>,
) -> Result<EngineConfig> {
    let env = |var: &str| std::env::var(var).ok();
    let mut config = EngineConfig::from_lookup(|var| match var {
        "CASTLE_OPERATOR_ID" => operator.map(|id| id.to_string()).or_else(|| env(var)),
        _ => env(var),
    })
    .context("resolving engine configuration")?;
    if let Some(path) = data_file {
        config.data_file = path;
    }
    Ok(config)
}

/// Open the engine described by `config`.
pub fn open_engine(config: &EngineConfig) -> Result<DealLifecycleEngine> {
    DealLifecycleEngine::open(config)
        .with_context(|| format!("opening {}", config.data_file.display()))
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("encoding output")?;
    println!("{text}");
    Ok(())
}
