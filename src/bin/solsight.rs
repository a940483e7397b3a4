//! CLI entrypoint: one subcommand per tool plus the portfolio workflow.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use solsight::config::Config;
use solsight::tools::ToolRegistry;
use solsight::utils::init_logging;
use solsight::workflow::portfolio_workflow;

#[derive(Debug, Parser)]
#[command(name = "solsight", author, version, about = "Solana analytics toolbox", long_about = None)]
struct Args {
    /// Path to the configuration file (TOML); falls back to environment
    #[arg(short, long)]
    config: Option<String>,

    /// Print the default configuration to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print accumulated metrics (Prometheus text format) to stderr on exit
    #[arg(long)]
    dump_metrics: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Native SOL balance of a wallet
    Balance {
        /// Wallet address (base58)
        address: String,
    },
    /// SPL token balances for an owner across mints
    TokenBalances {
        /// Owner wallet address
        owner: String,
        /// Token mint addresses
        #[arg(required = true, num_args = 1..)]
        mints: Vec<String>,
    },
    /// Recent classified transactions for an address
    Transactions {
        address: String,
        /// How many transactions to fetch
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Current market price for a token id, symbol or name
    Price {
        token: String,
    },
    /// Aggregated crypto news with trending topics
    News {
        /// Cap the number of articles printed
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Composite risk assessment for a token mint
    Risk {
        mint: String,
    },
    /// Full portfolio review: balance, holdings, prices, per-mint risk
    Portfolio {
        /// Owner wallet address
        owner: String,
        /// Token mint addresses held by the wallet
        #[arg(long, num_args = 1..)]
        mints: Vec<String>,
        /// Market identifiers to price (defaults to solana)
        #[arg(long, num_args = 1..)]
        price: Vec<String>,
    },
    /// List the available tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_level);
    solsight::metrics::init().expect("metrics init");

    if args.print_default_config {
        println!("{}", Config::default_toml());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::from_file(path).context("loading configuration file")?,
        None => Config::from_env(),
    };
    let registry = ToolRegistry::standard(&config)?;

    let output = match args.command {
        Some(Command::Balance { address }) => {
            registry
                .invoke("wallet_balance", json!({ "address": address }))
                .await
        }
        Some(Command::TokenBalances { owner, mints }) => {
            registry
                .invoke("token_balances", json!({ "owner": owner, "mints": mints }))
                .await
        }
        Some(Command::Transactions { address, limit }) => {
            registry
                .invoke(
                    "recent_transactions",
                    json!({ "address": address, "limit": limit }),
                )
                .await
        }
        Some(Command::Price { token }) => {
            registry.invoke("token_price", json!({ "token": token })).await
        }
        Some(Command::News { limit }) => {
            registry.invoke("crypto_news", json!({ "limit": limit })).await
        }
        Some(Command::Risk { mint }) => {
            registry.invoke("token_risk", json!({ "mint": mint })).await
        }
        Some(Command::Portfolio { owner, mints, price }) => {
            let price_terms = if price.is_empty() {
                vec!["solana".to_string()]
            } else {
                price
            };
            let workflow = portfolio_workflow(&owner, &mints, &price_terms);
            workflow.run(&registry).await?
        }
        Some(Command::Tools) | None => {
            let tools: Vec<_> = registry
                .list()
                .into_iter()
                .map(|(name, description)| json!({ "name": name, "description": description }))
                .collect();
            json!({ "tools": tools })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    if args.dump_metrics {
        eprintln!("{}", solsight::metrics::handle().render());
    }
    Ok(())
}
