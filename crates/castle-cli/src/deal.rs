//! # Deal Subcommand
//!
//! Lifecycle commands for a single deal. Every command names its deal
//! explicitly and the acting user with a flag.

use anyhow::Result;
use clap::{Args, Subcommand};

use castle_core::UserId;
use castle_engine::{CreateDealRequest, DealLifecycleEngine};

use crate::print_json;

/// Arguments for the `castle deal` subcommand.
#[derive(Args, Debug)]
pub struct DealArgs {
    #[command(subcommand)]
    pub command: DealCommand,
}

/// Deal subcommands.
#[derive(Subcommand, Debug)]
pub enum DealCommand {
    /// Open a new deal (→ OPEN).
    Create {
        /// Seller user id.
        #[arg(long)]
        seller: UserId,
        /// Item type, e.g. "NFT".
        #[arg(long = "type")]
        item_type: String,
        /// Item name.
        #[arg(long)]
        name: String,
        /// Item description.
        #[arg(long)]
        description: String,
        /// Price, e.g. "100" or "12,5".
        #[arg(long)]
        price: String,
    },

    /// Show one deal.
    Show {
        /// Deal id, e.g. "#K40213".
        id: String,
    },

    /// List deals, optionally only those a user takes part in.
    List {
        /// Only deals where this user is seller or buyer.
        #[arg(long)]
        user: Option<UserId>,
    },

    /// Check whether a buyer may join, without joining.
    Preview {
        id: String,
        #[arg(long)]
        buyer: UserId,
    },

    /// Join a deal and escrow its price (OPEN → IN_PROCESS).
    Join {
        id: String,
        #[arg(long)]
        buyer: UserId,
    },

    /// Decline a previewed deal. The deal stays open.
    Decline {
        id: String,
        #[arg(long)]
        buyer: UserId,
    },

    /// Withdraw an open deal (OPEN → CANCELLED).
    Cancel {
        id: String,
        /// Seller or operator user id.
        #[arg(long)]
        actor: UserId,
    },

    /// Seller reports the handoff (IN_PROCESS → TRANSFERRED).
    Ship {
        id: String,
        #[arg(long)]
        seller: UserId,
    },

    /// Buyer confirms receipt and releases escrow (TRANSFERRED → COMPLETED).
    Receive {
        id: String,
        #[arg(long)]
        buyer: UserId,
    },
}

/// Execute the deal subcommand.
pub fn run_deal(args: &DealArgs, engine: &DealLifecycleEngine) -> Result<u8> {
    match &args.command {
        DealCommand::Create {
            seller,
            item_type,
            name,
            description,
            price,
        } => {
            let request = CreateDealRequest::new(*seller, item_type, name, description, price);
            print_json(&engine.create_deal(&request)?)?;
        }
        DealCommand::Show { id } => print_json(&engine.deal(id)?)?,
        DealCommand::List { user } => {
            let deals = match user {
                Some(user) => engine.deals_for(*user),
                None => engine.deals(),
            };
            print_json(&deals)?;
        }
        DealCommand::Preview { id, buyer } => print_json(&engine.preview_deal(*buyer, id)?)?,
        DealCommand::Join { id, buyer } => print_json(&engine.join_deal(*buyer, id)?)?,
        DealCommand::Decline { id, buyer } => print_json(&engine.decline_deal(*buyer, id)?)?,
        DealCommand::Cancel { id, actor } => print_json(&engine.cancel_deal(*actor, id)?)?,
        DealCommand::Ship { id, seller } => print_json(&engine.confirm_shipped(*seller, id)?)?,
        DealCommand::Receive { id, buyer } => print_json(&engine.confirm_received(*buyer, id)?)?,
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use castle_core::Amount;
    use castle_engine::EngineConfig;

    const OPERATOR: UserId = UserId::new(500);

    fn engine(dir: &tempfile::TempDir) -> DealLifecycleEngine {
        let config = EngineConfig::new(dir.path().join("data.json"), OPERATOR);
        crate::open_engine(&config).unwrap()
    }

    fn run(engine: &DealLifecycleEngine, command: DealCommand) -> Result<u8> {
        run_deal(&DealArgs { command }, engine)
    }

    #[test]
    fn test_create_then_join_through_commands() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        run(
            &engine,
            DealCommand::Create {
                seller: UserId::new(1),
                item_type: "NFT".into(),
                name: "Pepe".into(),
                description: "Rare".into(),
                price: "10".into(),
            },
        )
        .unwrap();
        let id = engine.deals()[0].id().to_string();

        engine
            .credit_account(OPERATOR, UserId::new(2), Amount::whole(10))
            .unwrap();
        run(&engine, DealCommand::Join { id: id.clone(), buyer: UserId::new(2) }).unwrap();
        assert_eq!(engine.deal(&id).unwrap().escrow_amount(), Amount::whole(10));
    }

    #[test]
    fn test_engine_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        let err = run(&engine, DealCommand::Show { id: "#A1".into() }).unwrap_err();
        let engine_error = err.downcast_ref::<castle_engine::EngineError>().unwrap();
        assert_eq!(engine_error.kind(), castle_engine::ErrorKind::NotFound);
    }
}
