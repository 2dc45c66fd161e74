//! # Account Subcommand

use anyhow::Result;
use clap::{Args, Subcommand};

use castle_core::{Amount, UserId};
use castle_engine::DealLifecycleEngine;

use crate::print_json;

/// Arguments for the `castle account` subcommand.
#[derive(Args, Debug)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommand,
}

/// Account subcommands.
#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Show a user's account, creating it if absent.
    Show { user: UserId },

    /// Add funds to a user's balance (operator only).
    Credit {
        user: UserId,
        /// Amount to add, e.g. "150" or "0,5".
        amount: Amount,
        /// Acting user id; must be the operator.
        #[arg(long)]
        actor: UserId,
    },

    /// Record a user's display name.
    Register { user: UserId, name: String },
}

/// Execute the account subcommand.
pub fn run_account(args: &AccountArgs, engine: &DealLifecycleEngine) -> Result<u8> {
    let account = match &args.command {
        AccountCommand::Show { user } => engine.get_or_create_account(*user)?,
        AccountCommand::Credit {
            user,
            amount,
            actor,
        } => engine.credit_account(*actor, *user, *amount)?,
        AccountCommand::Register { user, name } => engine.register_user(*user, name)?,
    };
    print_json(&account)?;
    Ok(0)
}
