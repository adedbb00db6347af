//! Replay a file of hex-encoded transactions through the application.
//!
//! Usage: cargo run --bin tollgate-node -- --config node.yaml --transactions txs.hex
//!
//! Each line is checked against the mempool state, then admitted transactions are delivered
//! in blocks of at most `max_block_transactions` and committed. With `--simulate`, each line
//! is only simulated and nothing is committed.

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use commonware_utils::from_hex_formatted;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tollgate_node::{App, Config};
use tollgate_types::api::CheckTxKind;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tollgate-node")]
#[command(about = "Check, execute, and commit tollgate transactions")]
struct Args {
    /// Path to the YAML configuration
    #[arg(short, long)]
    config: PathBuf,

    /// File with one hex-encoded transaction per line
    #[arg(short, long)]
    transactions: PathBuf,

    /// Only estimate gas for each transaction
    #[arg(long, default_value_t = false)]
    simulate: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("tollgate-node failed: {err:#}");
        std::process::exit(1);
    }
}

fn read_transactions(path: &Path) -> Result<Vec<Bytes>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read transactions from {}", path.display()))?;
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            from_hex_formatted(line.trim())
                .map(Bytes::from)
                .with_context(|| format!("line {} is not hex", index + 1))
        })
        .collect()
}

fn run() -> Result<()> {
    let args = Args::parse();

    let raw = fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read config {}", args.config.display()))?;
    let config = Config::from_yaml(&raw)
        .context("failed to parse config")?
        .validate()
        .context("invalid config")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let transactions = read_transactions(&args.transactions)?;
    let mut app = App::new(&config).context("failed to initialize genesis")?;
    info!(
        chain_id = %config.chain_id,
        transactions = transactions.len(),
        "loaded transactions"
    );

    if args.simulate {
        for (index, tx) in transactions.into_iter().enumerate() {
            match app.simulate(tx) {
                Ok(res) => info!(
                    index,
                    gas_wanted = res.gas_info.gas_wanted,
                    gas_used = res.gas_info.gas_used,
                    log = %res.result.log,
                    "simulated"
                ),
                Err(err) => warn!(index, code = err.code(), %err, "simulation failed"),
            }
        }
        return Ok(());
    }

    let mut admitted = Vec::new();
    for (index, tx) in transactions.into_iter().enumerate() {
        match app.check_tx(tx.clone(), CheckTxKind::New) {
            Ok(_) => admitted.push(tx),
            Err(err) => warn!(index, code = err.code(), %err, "rejected by mempool"),
        }
    }

    for block in admitted.chunks(config.max_block_transactions) {
        let height = app.height() + 1;
        app.begin_block(height)
            .with_context(|| format!("failed to begin block {height}"))?;
        for (index, tx) in block.iter().enumerate() {
            match app.deliver_tx(tx.clone()) {
                Ok(res) => info!(
                    height,
                    index,
                    events = res.events.len(),
                    log = %res.log,
                    "delivered"
                ),
                Err(err) => warn!(height, index, code = err.code(), %err, "delivery failed"),
            }
        }
        app.commit()
            .with_context(|| format!("failed to commit block {height}"))?;
    }

    let accounts = app.query().accounts(Default::default())?;
    info!(height = app.height(), accounts = accounts.total, "finished");
    Ok(())
}
