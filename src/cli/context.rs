//! Shared startup for commands that talk to the ledger.

use super::config::{default_config_path, CertgovConfig, LoggingConfig};
use certgov::contracts::AddressBook;
use certgov::ledger::HttpLedger;
use certgov::App;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Per-request timeout for JSON-RPC calls (confirmation waits are separate).
const RPC_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Load the config, start logging and wire the components.
pub fn open(config_path: Option<PathBuf>) -> Result<App<HttpLedger>, Box<dyn std::error::Error>> {
    let config_path = config_path.unwrap_or_else(default_config_path);
    let config = CertgovConfig::load(&config_path)?;
    init_logging(&config.logging)?;

    let book = AddressBook::load(&config.contracts.address_book)?;
    let settings = config.settings()?;
    let ledger = Arc::new(HttpLedger::new(config.ledger.rpc_url.clone(), RPC_REQUEST_TIMEOUT)?);

    tracing::debug!(
        config = %config_path.display(),
        rpc_url = %ledger.url(),
        governor = %book.governor,
        "configuration loaded"
    );
    Ok(App::new(ledger, book, settings))
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;
    let registry = tracing_subscriber::registry().with(filter);

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()?;
        }
        None => registry
            .with(fmt::layer().without_time().with_writer(std::io::stderr))
            .try_init()?,
    }
    Ok(())
}
