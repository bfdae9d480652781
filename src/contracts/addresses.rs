//! Deployment address book.
//!
//! Loaded once at startup from the JSON record the deployment scripts
//! write (`deployedAddresses.json`) and treated as immutable afterwards.

use crate::error::{GovError, GovResult};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Addresses of the four contracts this client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    #[serde(rename = "CertAddr")]
    pub credential: Address,

    #[serde(rename = "MyGovernorAddr")]
    pub governor: Address,

    #[serde(rename = "GovTokenAddr")]
    pub token: Address,

    #[serde(rename = "TimeLockAddr")]
    pub timelock: Address,
}

impl AddressBook {
    pub fn from_json(json: &str) -> GovResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| GovError::Config(format!("invalid address book: {}", e)))
    }

    pub fn load(path: &Path) -> GovResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            GovError::Config(format!(
                "failed to read address book '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }
}
