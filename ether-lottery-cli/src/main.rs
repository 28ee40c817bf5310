mod commands;
mod config;

use clap::{Parser, Subcommand};
use ether_lottery_core::{LotteryConfig, LotteryError};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ether-lottery")]
#[command(about = "Ether Lottery - play the Ethereum lottery from your terminal")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/ether-lottery/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint of the wallet provider
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Lottery contract address
    #[arg(long, global = true)]
    contract: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show manager, pot, participants and winner history
    Status {
        /// Print the view state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enter the current round by paying the entry fee
    Participate {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Manager only: draw the winner of the current round
    Results {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Only after a lottery round: hand the manager role on
    SetManager {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Interactive session
    Interactive,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "ether_lottery_cli={},ether_lottery_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut lottery_config = config::load(cli.config.as_deref())?;
    if let Some(url) = cli.rpc_url {
        lottery_config.rpc_url = Some(url);
    }
    if let Some(contract) = cli.contract {
        lottery_config.contract_address = contract;
    }

    // Execute command
    let result = run(cli.command, &lottery_config).await;

    if let Err(e) = result {
        match e.downcast_ref::<LotteryError>() {
            Some(LotteryError::ProviderMissing) => {
                eprintln!("{}", LotteryError::ProviderMissing);
                eprintln!(
                    "Set {} or pass --rpc-url to point at your wallet's JSON-RPC endpoint",
                    config::ENV_RPC_URL
                );
            }
            Some(LotteryError::Config(msg)) => {
                eprintln!("Error: Invalid configuration: {}", msg);
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Commands, config: &LotteryConfig) -> anyhow::Result<()> {
    let sync = ether_lottery_core::build_from_config(config)?;

    match command {
        Commands::Status { json } => commands::show_status(&sync, config, json).await,
        Commands::Participate { yes } => commands::participate(&sync, config, yes).await,
        Commands::Results { yes } => commands::get_results(&sync, config, yes).await,
        Commands::SetManager { yes } => commands::set_new_manager(&sync, config, yes).await,
        Commands::Interactive => commands::interactive(&sync, config).await,
    }
}
