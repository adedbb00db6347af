//! Produce a hex-encoded, signed send transaction for replay.
//!
//! Usage: cargo run --bin sign-send -- --seed 1 --to <address> --amount 10 --fee 5

use anyhow::{Context, Result};
use clap::Parser;
use commonware_codec::Encode;
use commonware_cryptography::{ed25519::PrivateKey, Signer};
use commonware_utils::hex;
use tollgate_types::{Address, Fee, Message, Transaction};

#[derive(Parser, Debug)]
#[command(name = "sign-send")]
#[command(about = "Sign a send transaction with a deterministic key")]
struct Args {
    /// Seed of the signing key
    #[arg(short, long)]
    seed: u64,

    /// Recipient address (hex)
    #[arg(short, long)]
    to: String,

    /// Amount to send
    #[arg(short, long)]
    amount: u64,

    /// Account sequence of the signer
    #[arg(short, long, default_value_t = 0)]
    nonce: u64,

    /// Fee offered
    #[arg(long, default_value_t = 0)]
    fee: u64,

    /// Gas limit bought by the fee
    #[arg(long, default_value_t = 200_000)]
    gas_limit: u64,

    /// Print the signer address instead of a transaction
    #[arg(long, default_value_t = false)]
    address: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("sign-send failed: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let signer = PrivateKey::from_seed(args.seed);
    let from = Address::from_public(&signer.public_key());
    if args.address {
        println!("{from}");
        return Ok(());
    }

    let to = Address::parse(&args.to).context("invalid recipient")?;
    let tx = Transaction::sign(
        &signer,
        args.nonce,
        vec![Message::Send {
            from,
            to,
            amount: args.amount,
        }],
        Fee {
            amount: args.fee,
            gas_limit: args.gas_limit,
        },
        "",
    );
    println!("{}", hex(&tx.encode()));
    Ok(())
}
