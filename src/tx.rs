//! Transaction submission and confirmation.
//!
//! A submission is signed by the node-managed account of the session
//! identity, then awaited until its receipt appears or the confirmation
//! timeout elapses. Failures are classified into three kinds so callers
//! never have to look at raw RPC errors.

use crate::contracts::ContractCall;
use crate::ledger::{CallRequest, LedgerClient, Receipt, RpcError};
use crate::session::Identity;
use alloy_primitives::B256;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Default time to wait for inclusion.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Classified submission failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    #[error("transaction rejected by the wallet")]
    UserRejected,

    #[error("transaction reverted: {0}")]
    ContractRevert(String),

    #[error("network failure: {0}")]
    Network(String),
}

impl From<RpcError> for TxError {
    fn from(err: RpcError) -> Self {
        if err.is_user_rejection() {
            return TxError::UserRejected;
        }
        if let Some(reason) = err.revert_reason() {
            return TxError::ContractRevert(reason);
        }
        TxError::Network(err.to_string())
    }
}

/// Confirmed inclusion of a submitted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub transaction_hash: B256,
    pub block_number: u64,
}

/// Signs, submits and awaits contract calls.
pub struct TransactionSubmitter<L> {
    ledger: Arc<L>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl<L: LedgerClient> TransactionSubmitter<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self {
            ledger,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timing(mut self, confirmation_timeout: Duration, poll_interval: Duration) -> Self {
        self.confirmation_timeout = confirmation_timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Submit `call` as `identity` and wait for a successful receipt.
    pub async fn submit(&self, identity: &Identity, call: ContractCall) -> Result<Confirmation, TxError> {
        let request = CallRequest {
            from: Some(identity.address()),
            to: call.to,
            data: call.data.clone(),
            value: call.value,
        };

        let hash = self.ledger.send_transaction(&request).await?;
        info!(method = call.method, tx = %hash, from = %identity, "transaction submitted");

        let receipt = match timeout(self.confirmation_timeout, self.await_receipt(hash)).await {
            Ok(receipt) => receipt?,
            Err(_) => {
                warn!(method = call.method, tx = %hash, "confirmation timed out");
                return Err(TxError::Network(format!(
                    "transaction {} not confirmed within {}s",
                    hash,
                    self.confirmation_timeout.as_secs()
                )));
            }
        };

        if !receipt.status {
            let reason = self.replay_reason(&request, receipt.block_number).await;
            warn!(method = call.method, tx = %hash, %reason, "transaction reverted");
            return Err(TxError::ContractRevert(reason));
        }

        info!(
            method = call.method,
            tx = %hash,
            block = receipt.block_number,
            "transaction confirmed"
        );
        Ok(Confirmation {
            transaction_hash: hash,
            block_number: receipt.block_number,
        })
    }

    /// Poll until the receipt appears. Transient transport errors are retried.
    async fn await_receipt(&self, hash: B256) -> Result<Receipt, TxError> {
        loop {
            match self.ledger.transaction_receipt(&hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => debug!(tx = %hash, "receipt pending"),
                Err(RpcError::Transport(detail)) => {
                    debug!(tx = %hash, %detail, "receipt poll failed, retrying")
                }
                Err(RpcError::Timeout) => debug!(tx = %hash, "receipt poll timed out, retrying"),
                Err(err) => return Err(err.into()),
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Re-run a reverted call to recover its revert reason.
    async fn replay_reason(&self, request: &CallRequest, block: u64) -> String {
        match self.ledger.call(request).await {
            Err(err) => err
                .revert_reason()
                .unwrap_or_else(|| format!("transaction reverted in block {}", block)),
            Ok(_) => format!("transaction reverted in block {}", block),
        }
    }
}
