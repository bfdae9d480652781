//! Trait abstraction for the ledger node connection.
//!
//! Every component talks to the ledger through `LedgerClient`, so the
//! JSON-RPC transport can be swapped for `MockLedger` in tests.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

/// Result type for ledger operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// JSON-RPC error code for a request the wallet holder declined (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC error code for an execution revert.
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// JSON-RPC error code for an unsupported method.
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// Ledger connection errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// The node could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node did not answer in time.
    #[error("request timed out")]
    Timeout,

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Bytes>,
    },

    /// The node answered with something we could not interpret.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl RpcError {
    /// Whether the node reports that contract logic rejected the call.
    pub fn is_revert(&self) -> bool {
        match self {
            RpcError::Rpc { code, message, .. } => {
                *code == EXECUTION_REVERTED_CODE || message.to_lowercase().contains("revert")
            }
            _ => false,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, RpcError::Rpc { code, .. } if *code == USER_REJECTED_CODE)
    }

    /// Human-readable revert reason, preferring the `Error(string)` payload.
    pub fn revert_reason(&self) -> Option<String> {
        if !self.is_revert() {
            return None;
        }
        match self {
            RpcError::Rpc { message, data, .. } => Some(
                data.as_ref()
                    .and_then(|data| crate::abi::decode_revert_reason(data))
                    .unwrap_or_else(|| message.clone()),
            ),
            _ => None,
        }
    }
}

/// A message call or transaction against a contract.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// Event log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub log_index: u64,
}

/// Transaction inclusion receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// `false` when the transaction was included but reverted.
    pub status: bool,
    pub logs: Vec<Log>,
}

/// Log query for one contract and one event topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topic0: B256,
    pub from_block: u64,
    /// `None` scans up to the latest block.
    pub to_block: Option<u64>,
}

/// Ledger node abstraction.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Accounts the node can sign for, without prompting.
    async fn accounts(&self) -> RpcResult<Vec<Address>>;

    /// Ask the signing backend to expose its accounts (may prompt).
    async fn request_accounts(&self) -> RpcResult<Vec<Address>>;

    /// Execute a read-only message call against the latest block.
    async fn call(&self, request: &CallRequest) -> RpcResult<Bytes>;

    /// Sign and broadcast a transaction through the node-managed account.
    async fn send_transaction(&self, request: &CallRequest) -> RpcResult<B256>;

    /// Receipt of an included transaction, `None` while pending.
    async fn transaction_receipt(&self, hash: &B256) -> RpcResult<Option<Receipt>>;

    async fn block_number(&self) -> RpcResult<u64>;

    async fn get_logs(&self, filter: &LogFilter) -> RpcResult<Vec<Log>>;
}
