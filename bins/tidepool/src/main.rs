//! tidepool — simulate upcoming block templates from a node's mempool.
//!
//! Fetches a consistent mempool/template snapshot over RPC, simulates a run
//! of future blocks by repeatedly carving templates out of the shrinking
//! pool, and prints a side-by-side comparison of tip, template, and
//! simulated blocks.

mod fetch;
mod report;
mod rpc;
mod sim;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use tidepool_core::builder::Budgets;

/// CLI arguments for the simulator.
#[derive(Debug, Parser)]
#[command(name = "tidepool")]
#[command(about = "Mempool-driven block template simulator", long_about = None)]
struct Args {
    /// Node RPC endpoint.
    #[arg(long, default_value = "http://127.0.0.1:8332")]
    rpc_endpoint: String,

    /// RPC username.
    #[arg(long)]
    rpc_user: String,

    /// RPC password.
    #[arg(long)]
    rpc_password: String,

    /// Number of future blocks to simulate beyond the node's template.
    #[arg(long, default_value = "3")]
    blocks: usize,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let client = rpc::RpcClient::new(&args.rpc_endpoint, &args.rpc_user, &args.rpc_password);
    let (tip, mut pool, template) = fetch::fetch_synced(&client).await?;
    info!(
        height = tip.height,
        transactions = pool.len(),
        fees = pool.total_fees(),
        weight = pool.total_weight(),
        "starting simulation"
    );

    let budgets = Budgets::default();
    let simulated = sim::simulate(&mut pool, &template, args.blocks, &budgets);
    info!(
        remaining = pool.len(),
        fees = pool.total_fees(),
        "pool after simulation"
    );

    let mut blocks = vec![tip, template];
    blocks.extend(simulated);
    println!("\n{}", report::blocks_table(&blocks));
    Ok(())
}
