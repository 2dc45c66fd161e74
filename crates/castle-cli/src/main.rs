//! # castle CLI entry point
//!
//! Parses command-line arguments, opens the engine and dispatches to the
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use castle_cli::account::{run_account, AccountArgs};
use castle_cli::deal::{run_deal, DealArgs};
use castle_cli::{open_engine, resolve_config};
use castle_core::UserId;
use castle_engine::EngineError;

/// Castle escrow operator CLI.
///
/// Creates and drives escrowed deals and manages account balances in the
/// persisted JSON document.
#[derive(Parser, Debug)]
#[command(name = "castle", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    /// Ignored when RUST_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path of the JSON document (overrides CASTLE_DATA_FILE).
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    /// Operator user id (overrides CASTLE_OPERATOR_ID).
    #[arg(long, global = true)]
    operator: Option<UserId>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deal lifecycle: create, show, list, preview, join, decline, cancel, ship, receive.
    Deal(DealArgs),

    /// Accounts: show, credit, register.
    Account(AccountArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = resolve_config(cli.data_file, cli.operator)
        .and_then(|config| open_engine(&config))
        .and_then(|engine| match &cli.command {
            Commands::Deal(args) => run_deal(args, &engine),
            Commands::Account(args) => run_account(args, &engine),
        });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            match e.downcast_ref::<EngineError>() {
                Some(engine_error) => {
                    eprintln!("error ({}): {engine_error}", engine_error.kind());
                    ExitCode::from(2)
                }
                None => {
                    eprintln!("error: {e:#}");
                    ExitCode::from(1)
                }
            }
        }
    }
}
