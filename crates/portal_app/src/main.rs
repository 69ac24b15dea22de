//! `rooch-portal`: drive the portal core from a terminal.

mod commands;
mod context;
mod wallet;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use portal_core::PortalConfig;
use portal_core::logging;

use crate::commands::{ChainsCommand, FaucetCommand};
use crate::context::Portal;

#[derive(Parser)]
#[command(name = "rooch-portal")]
#[command(version)]
#[command(about = "Rooch portal: chains, faucet and farms from the command line", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: ~/.rooch-portal/config.json)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List, add, switch and delete chains
    #[command(subcommand)]
    Chains(ChainsCommand),

    /// Check faucet eligibility and manage the inviter hint
    #[command(subcommand)]
    Faucet(FaucetCommand),

    /// Show active and finished farms with the owner's positions
    Farms {
        /// Rooch address whose LP positions are joined in
        #[arg(long)]
        owner: String,
    },

    /// Poll the gas balance of an address
    Balance {
        #[arg(long)]
        owner: String,
        /// Keep polling until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Print the route table
    Routes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PortalConfig::load_from_path(path)?,
        None => PortalConfig::load()?,
    };
    let _log_guard = logging::init_logging(&config)?;
    info!(version = env!("CARGO_PKG_VERSION"), "rooch-portal starting");

    let mut out = std::io::stdout();
    if let Commands::Routes = cli.command {
        return commands::routes(&mut out);
    }

    let portal = Portal::open(config).await?;
    let result = match cli.command {
        Commands::Chains(cmd) => commands::chains(&portal, cmd, &mut out).await,
        Commands::Faucet(cmd) => commands::faucet(&portal, cmd, &mut out).await,
        Commands::Farms { owner } => commands::farms(&portal, &owner, &mut out).await,
        Commands::Balance { owner, watch } => {
            commands::balance(&portal, &owner, watch, &mut out).await
        }
        Commands::Routes => Ok(()),
    };
    portal.close();
    result
}
