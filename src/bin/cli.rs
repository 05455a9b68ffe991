//! Command-line interface for bridging USDC and inspecting history.

use std::sync::Arc;

use alloy::primitives::Address;
use clap::{Parser, Subcommand};

use arc_bridge::config::{setup_tracing, Ctx, Env};
use arc_bridge::fee::FeeCalculator;
use arc_bridge::history::file::JsonFileStore;
use arc_bridge::history::HistoryLedger;
use arc_bridge::orchestrator::{BridgeOptions, Orchestrator};
use arc_bridge::usdc::Usdc;
use arc_bridge::wallet::LocalWallet;

#[derive(Debug, Parser)]
#[command(name = "arc-bridge")]
#[command(about = "Bridge USDC between the ARC home chain and external chains")]
#[command(version)]
struct Cli {
    #[clap(flatten)]
    env: Env,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Burn USDC on the source chain for minting on the destination
    Transfer {
        /// Source chain key (e.g. ARC, ETH_SEPOLIA)
        #[arg(long)]
        source: String,
        /// Destination chain key
        #[arg(long)]
        destination: String,
        /// Amount in USDC (e.g. 10.50)
        #[arg(long)]
        amount: Usdc,
        /// Recipient address on the destination chain
        #[arg(long)]
        recipient: Address,
        /// Optional memo carried in the hook payload (max 128 bytes)
        #[arg(long)]
        memo: Option<String>,
    },
    /// List completed transfers, newest first
    History {
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        page_size: usize,
    },
    /// Delete all recorded transfers for this deployment
    ClearHistory,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let ctx = Ctx::load_files(&cli.env.config, &cli.env.secrets)?;
    setup_tracing(&ctx.log_level);

    let namespace = ctx.namespace()?;
    let home = ctx.registry.resolve(&ctx.home_key)?;
    let wallet = Arc::new(LocalWallet::new(
        ctx.signer.clone(),
        home.network_id,
        home.rpc_url.clone(),
    ));

    let ledger = HistoryLedger::new(Box::new(JsonFileStore::new(&ctx.history_file)), namespace);
    let orchestrator = Orchestrator::new(
        ctx.registry,
        wallet,
        FeeCalculator::new(ctx.fee),
        ledger,
        BridgeOptions {
            home_key: ctx.home_key,
            min_transfer: ctx.min_transfer,
            min_finality_threshold: ctx.min_finality_threshold,
            base_hook_payload: ctx.base_hook_payload,
        },
    );

    match cli.command {
        Commands::Transfer {
            source,
            destination,
            amount,
            recipient,
            memo,
        } => {
            let request = orchestrator.request(&source, &destination, amount, recipient, memo)?;
            let record = orchestrator.transfer(&request).await?;
            println!(
                "burned {} USDC on {source} for {} on {destination}: {}",
                record.amount, record.recipient, record.tx_hash
            );
            println!("destination mint is pending off-chain attestation");
        }
        Commands::History { page, page_size } => {
            let records = orchestrator.history(page, page_size).await?;
            if records.is_empty() {
                println!("no transfers on page {page}");
            }
            for record in records {
                let memo = record.memo.as_deref().unwrap_or("-");
                println!(
                    "{}  {:?}  {} USDC  to {}  memo {}  tx {}",
                    record.timestamp,
                    record.direction,
                    record.amount,
                    record.recipient,
                    memo,
                    record.tx_hash
                );
            }
        }
        Commands::ClearHistory => {
            orchestrator.clear_history().await?;
            println!("history cleared");
        }
    }

    Ok(())
}
