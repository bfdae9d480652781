use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

pub mod certificates;
pub mod config;
pub mod context;
pub mod init_config;
pub mod proposals;
pub mod roles;
pub mod status;
pub mod tokens;
pub mod version;

#[derive(Parser)]
#[command(name = "certgov")]
#[command(author = "certgov contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for credential governance", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.config/certgov/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    InitConfig {
        /// Deployment record to reference (default: deployedAddresses.json next to the config)
        #[arg(long)]
        address_book: Option<PathBuf>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Connect and show identity, admin flag and token balance
    Status,

    /// List proposals with their state and offered actions
    Proposals,

    /// Create a single-call proposal
    Propose {
        /// Target contract: "credential", "token" or an address
        #[arg(long, default_value = "credential")]
        target: String,

        /// Function name (or full signature for overloads)
        #[arg(long, default_value = "issue")]
        function: String,

        /// Arguments as a JSON array, e.g. '["Alice","Rust 101","A","2024-06-01"]'
        #[arg(long)]
        args: String,

        /// Proposal description (also the key for queue and execute)
        #[arg(long)]
        description: String,
    },

    /// Vote on an active proposal
    Vote {
        /// Proposal id (decimal or 0x-hex)
        id: String,

        /// "for" or "against"
        support: String,

        /// Submit even if the displayed state does not offer voting
        #[arg(long)]
        force: bool,
    },

    /// Queue a succeeded proposal in the timelock
    Queue {
        id: String,

        #[arg(long)]
        force: bool,
    },

    /// Execute a queued proposal
    Execute {
        id: String,

        #[arg(long)]
        force: bool,
    },

    /// List issued certificates
    Certificates,

    /// Grant a timelock role (admins only)
    GrantRole {
        /// "proposer" or "executor"
        role: String,

        /// Address receiving the role
        grantee: String,
    },

    /// Mint voting tokens
    Mint {
        to: String,

        /// Amount in the token's smallest unit
        amount: String,
    },

    /// Delegate voting power (to yourself by default)
    Delegate {
        to: Option<String>,
    },

    /// Display version information
    Version,
}

/// Parse a 0x-prefixed ledger address.
pub fn parse_address(text: &str) -> Result<Address, String> {
    Address::from_str(text.trim()).map_err(|e| format!("invalid address {:?}: {}", text, e))
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.config;
    match cli.command {
        Commands::Version => {
            version::execute();
            Ok(())
        }
        Commands::InitConfig {
            address_book,
            force,
        } => init_config::execute(config, address_book, force),
        command => {
            let app = context::open(config)?;
            match command {
                Commands::Status => status::execute(&app).await,
                Commands::Proposals => proposals::list(&app).await,
                Commands::Propose {
                    target,
                    function,
                    args,
                    description,
                } => proposals::propose(&app, &target, function, args, description).await,
                Commands::Vote { id, support, force } => {
                    proposals::vote(&app, &id, &support, force).await
                }
                Commands::Queue { id, force } => proposals::queue(&app, &id, force).await,
                Commands::Execute { id, force } => proposals::execute(&app, &id, force).await,
                Commands::Certificates => certificates::list(&app).await,
                Commands::GrantRole { role, grantee } => {
                    roles::grant(&app, &role, &grantee).await
                }
                Commands::Mint { to, amount } => tokens::mint(&app, &to, &amount).await,
                Commands::Delegate { to } => tokens::delegate(&app, to.as_deref()).await,
                Commands::Version | Commands::InitConfig { .. } => Ok(()),
            }
        }
    }
}
