//! Issued-certificate catalog.

use crate::contracts::credential;
use crate::contracts::{ContractGateway, ScanRange};
use crate::error::GovResult;
use crate::ledger::LedgerClient;
use crate::listing::{IndexFailure, Listing};
use alloy_primitives::U256;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// A credential record, immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Certificate {
    #[serde(serialize_with = "decimal")]
    pub id: U256,
    pub name: String,
    pub course: String,
    pub grade: String,
    pub date: String,
}

fn decimal<S: serde::Serializer>(id: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_string())
}

pub struct CertificateCatalog<L> {
    gateway: Arc<ContractGateway<L>>,
    range: ScanRange,
}

impl<L: LedgerClient> CertificateCatalog<L> {
    pub fn new(gateway: Arc<ContractGateway<L>>, range: ScanRange) -> Self {
        Self { gateway, range }
    }

    /// Every issued certificate, in issuance order.
    ///
    /// A record whose lookup fails is omitted and reported.
    pub async fn list_certificates(&self) -> GovResult<Listing<Certificate>> {
        let contracts = self.gateway.bind(None);
        let registry = contracts.credential();
        let logs = registry.issued_logs(self.range).await?;

        let mut listing = Listing::default();
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(logs.len());
        for log in &logs {
            match credential::certificate_id(log) {
                Ok(id) if seen.insert(id) => ids.push(id),
                Ok(_) => {}
                Err(e) => {
                    let item_id = format!("log {}:{}", log.block_number, log.log_index);
                    listing.failures.push(IndexFailure::new(item_id, e.to_string()));
                }
            }
        }

        let records = join_all(ids.iter().map(|id| registry.certificate(*id))).await;
        for (id, record) in ids.into_iter().zip(records) {
            match record {
                Ok(certificate) => listing.items.push(certificate),
                Err(e) => {
                    warn!(certificate_id = %id, error = %e, "certificate lookup failed");
                    listing
                        .failures
                        .push(IndexFailure::new(id.to_string(), e.to_string()));
                }
            }
        }

        debug!(
            certificates = listing.items.len(),
            failures = listing.failures.len(),
            "certificate listing refreshed"
        );
        Ok(listing)
    }
}
