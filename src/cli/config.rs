//! certgov configuration file handling
//!
//! Operator settings only: where the ledger node is, where the deployment
//! record lives, how long to wait for confirmations and how to log. Contract
//! addresses come from the deployment record, never from this file.

use certgov::abi::Interface;
use certgov::contracts::{credential, ScanRange};
use certgov::error::{GovError, GovResult};
use certgov::AppSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RECEIPT_POLL_INTERVAL_MS: u64 = 500;

/// Name of the deployment record written by the deploy scripts.
pub const ADDRESS_BOOK_FILE: &str = "deployedAddresses.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertgovConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,

    pub contracts: ContractsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ledger node connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Seconds to wait for a transaction to be included
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,

    /// Blocks per event-scan page (unset scans the whole history at once)
    pub log_page_size: Option<u64>,

    /// First block to scan for events
    #[serde(default)]
    pub from_block: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Deployment record (`CertAddr`, `MyGovernorAddr`, `GovTokenAddr`, `TimeLockAddr`)
    pub address_book: PathBuf,

    /// Compiled artifact describing the credential contract
    pub credential_abi: Option<PathBuf>,

    /// Signatures proposals may call when no artifact is given
    #[serde(default = "default_credential_functions")]
    pub credential_functions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_SECS
}

fn default_receipt_poll_interval_ms() -> u64 {
    DEFAULT_RECEIPT_POLL_INTERVAL_MS
}

fn default_credential_functions() -> Vec<String> {
    credential::DEFAULT_FUNCTIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            receipt_poll_interval_ms: DEFAULT_RECEIPT_POLL_INTERVAL_MS,
            log_page_size: None,
            from_block: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl CertgovConfig {
    #[allow(dead_code)]
    pub fn new(address_book: PathBuf) -> Self {
        Self {
            ledger: LedgerConfig::default(),
            contracts: ContractsConfig {
                address_book,
                credential_abi: None,
                credential_functions: default_credential_functions(),
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// Relative contract paths are resolved against the file's directory.
    pub fn load(path: &Path) -> GovResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            GovError::Config(format!(
                "failed to read config file '{}': {} (run `certgov init-config` first)",
                path.display(),
                e
            ))
        })?;

        let mut config: CertgovConfig = toml::from_str(&contents).map_err(|e| {
            GovError::Config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        if let Some(base) = path.parent() {
            config.contracts.address_book = base.join(&config.contracts.address_book);
            if let Some(abi) = config.contracts.credential_abi.take() {
                config.contracts.credential_abi = Some(base.join(abi));
            }
        }

        Ok(config)
    }

    #[allow(dead_code)]
    pub fn save(&self, path: &Path) -> GovResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| GovError::Config(format!("failed to serialize config: {}", e)))?;
        write_file(path, &contents)
    }

    /// Credential interface from the artifact if configured, else from signatures.
    pub fn credential_interface(&self) -> GovResult<Interface> {
        match &self.contracts.credential_abi {
            Some(path) => {
                let json = fs::read_to_string(path).map_err(|e| {
                    GovError::Config(format!(
                        "failed to read credential artifact '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                Interface::from_artifact_json(&json).map_err(|e| {
                    GovError::Config(format!(
                        "invalid credential artifact '{}': {}",
                        path.display(),
                        e
                    ))
                })
            }
            None => Interface::from_signatures(&self.contracts.credential_functions)
                .map_err(|e| GovError::Config(format!("invalid credential_functions: {}", e))),
        }
    }

    pub fn settings(&self) -> GovResult<AppSettings> {
        Ok(AppSettings {
            confirmation_timeout: Duration::from_secs(self.ledger.confirmation_timeout_secs),
            receipt_poll_interval: Duration::from_millis(self.ledger.receipt_poll_interval_ms),
            scan: ScanRange {
                from_block: self.ledger.from_block,
                page_size: self.ledger.log_page_size,
            },
            credential_interface: self.credential_interface()?,
        })
    }

    /// Default configuration content, with comments.
    pub fn generate_default_toml(address_book: &Path) -> String {
        format!(
            r#"# certgov operator configuration
#
# Contract addresses are read from the deployment record below; they are
# not configured here.

[ledger]
# JSON-RPC endpoint of the ledger node. The node's managed account signs
# transactions; no keys are stored by certgov.
rpc_url = "{rpc_url}"

# Seconds to wait for a submitted transaction to be included
confirmation_timeout_secs = {timeout}

# Interval between receipt polls, in milliseconds
receipt_poll_interval_ms = {poll}

# Scan event history in pages of this many blocks (optional).
# Leave commented to query the whole history at once.
# log_page_size = 10000

# First block to scan for proposal and certificate events
from_block = 0

[contracts]
# Deployment record with CertAddr, MyGovernorAddr, GovTokenAddr, TimeLockAddr
address_book = "{address_book}"

# Compiled credential artifact (optional); its "abi" array lists the
# functions proposals may call
# credential_abi = "artifacts/Cert.json"

# Used when no artifact is given
credential_functions = ["{issue}"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/certgov/certgov.log"
"#,
            rpc_url = DEFAULT_RPC_URL,
            timeout = DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            poll = DEFAULT_RECEIPT_POLL_INTERVAL_MS,
            address_book = address_book.display(),
            issue = credential::ISSUE,
        )
    }

    pub fn create_default(config_path: &Path, address_book: &Path) -> GovResult<()> {
        write_file(config_path, &Self::generate_default_toml(address_book))
    }
}

fn write_file(path: &Path, contents: &str) -> GovResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| GovError::Config(format!("failed to create config directory: {}", e)))?;
    }
    fs::write(path, contents).map_err(|e| {
        GovError::Config(format!(
            "failed to write config file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Directory holding the config file and, by default, the deployment record.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("certgov")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}
