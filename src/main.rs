//! name-minter command-line entry point.
//!
//! ```text
//! name-minter [--config minter.toml] [--report run.json] [--log-json] <COMMAND>
//!
//!   mint [--count N]     commit/register N random names per account
//!   wrap <AMOUNT>        wrap native token (amount in ether units)
//!   unwrap <AMOUNT>      unwrap back to native token
//!   status               balances and next nonce per account
//! ```
//!
//! Private keys are read from `PRIVATE_KEY_1` .. `PRIVATE_KEY_16`.

use alloy::primitives::utils::parse_ether;
use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use name_minter::config::loader::load_config;
use name_minter::lifecycle::{signals, Shutdown};
use name_minter::observability::{logging, metrics};
use name_minter::runner::{load_accounts, Operation, Runner};

#[derive(Parser)]
#[command(name = "name-minter", version)]
#[command(about = "Commit/register name minting and token wrapping across accounts", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write a JSON run report to this path.
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint random names through commit/register
    Mint {
        /// Names per account
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
    /// Wrap native token
    Wrap { amount: String },
    /// Unwrap to native token
    Unwrap { amount: String },
    /// Show balances
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(
        &config.observability.log_level,
        cli.log_json || config.observability.json_logs,
    );
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "name-minter starting");

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let operation = match cli.command {
        Commands::Mint { count } => Operation::Mint { count: count.max(1) },
        Commands::Wrap { amount } => Operation::Wrap {
            amount: parse_amount(&amount)?,
        },
        Commands::Unwrap { amount } => Operation::Unwrap {
            amount: parse_amount(&amount)?,
        },
        Commands::Status => Operation::Status,
    };

    let accounts = load_accounts(config.runner.max_accounts, |key| std::env::var(key).ok());
    tracing::info!(
        accounts = accounts.len(),
        rpc_url = %config.network.rpc_url,
        chain_id = config.network.chain_id,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_ctrl_c_handler(shutdown.clone());

    let runner = Runner::new(config, shutdown);
    let summary = runner.run(&accounts, &operation).await?;
    summary.log();
    if let Some(path) = cli.report.as_deref() {
        summary.write_json(path)?;
    }

    tracing::info!("Done");
    Ok(())
}

fn parse_amount(raw: &str) -> Result<U256, Box<dyn std::error::Error>> {
    let amount = parse_ether(raw.trim())?;
    if amount.is_zero() {
        return Err(format!("amount must be greater than zero: {raw}").into());
    }
    Ok(amount)
}
