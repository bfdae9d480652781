//! Credential (certificate registry) contract handle.

use super::{events, read, ScanRange};
use crate::abi::{self, AbiError, ParamType, Token};
use crate::certificates::Certificate;
use crate::error::{GovError, GovResult};
use crate::ledger::{LedgerClient, Log};
use alloy_primitives::{Address, B256, U256};

pub const CERTIFICATES: &str = "certificates(uint256)";
pub const ISSUE: &str = "issue(string,string,string,string)";
pub const CERTIFICATE_ISSUED: &str = "CertificateIssued(uint256)";

/// Functions proposals may call when no artifact describes the contract.
pub const DEFAULT_FUNCTIONS: &[&str] = &[ISSUE];

pub fn certificate_issued_topic() -> B256 {
    abi::event_topic(CERTIFICATE_ISSUED)
}

/// Certificate id carried by a `CertificateIssued` log.
///
/// Read from the first indexed topic when present, otherwise from the
/// first data word.
pub fn certificate_id(log: &Log) -> Result<U256, AbiError> {
    if let Some(topic) = log.topics.get(1) {
        return Ok(U256::from_be_bytes(topic.0));
    }
    abi::decode(&[ParamType::Uint(256)], &log.data)?
        .pop()
        .and_then(Token::into_uint)
        .ok_or_else(|| AbiError::Malformed("CertificateIssued without id".to_string()))
}

/// Certificate registry bound to a ledger connection.
pub struct Credential<'a, L> {
    ledger: &'a L,
    address: Address,
}

impl<'a, L: LedgerClient> Credential<'a, L> {
    pub fn new(ledger: &'a L, address: Address) -> Self {
        Self { ledger, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn issued_logs(&self, range: ScanRange) -> GovResult<Vec<Log>> {
        events::scan_logs(self.ledger, self.address, certificate_issued_topic(), range).await
    }

    /// Stored record for an issued certificate.
    pub async fn certificate(&self, id: U256) -> GovResult<Certificate> {
        let data = abi::encode_call(abi::selector(CERTIFICATES), &[Token::Uint(id)]);
        let output = read(self.ledger, self.address, data).await?;
        let fields = abi::decode(&vec![ParamType::String; 4], &output)
            .map_err(|e| GovError::malformed("certificates", e))?;

        let mut strings = fields.into_iter().filter_map(Token::into_string);
        match (strings.next(), strings.next(), strings.next(), strings.next()) {
            (Some(name), Some(course), Some(grade), Some(date)) => Ok(Certificate {
                id,
                name,
                course,
                grade,
                date,
            }),
            _ => Err(GovError::NetworkError(
                "incomplete certificates response".to_string(),
            )),
        }
    }
}
