//! Operator-facing error taxonomy.
//!
//! Every failure the client can report maps onto one of these kinds. None of
//! them is fatal to the process: the worst outcome is that one action does
//! not complete and the operator is told why.

use crate::abi::AbiError;
use crate::ledger::RpcError;
use crate::tx::TxError;
use alloy_primitives::Address;

/// Result type for client operations.
pub type GovResult<T> = Result<T, GovError>;

/// Client errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GovError {
    /// The signing identity declined the request.
    #[error("request rejected by the wallet")]
    UserRejected,

    /// The call reached the ledger and contract logic rejected it.
    #[error("contract reverted: {0}")]
    ContractRevert(String),

    /// The node was unreachable, timed out or answered nonsense.
    #[error("network error: {0}")]
    NetworkError(String),

    /// Operator input was rejected before anything was sent.
    #[error("invalid input: {0}")]
    ValidationError(String),

    /// Another action for the same proposal is still in flight.
    #[error("an action for proposal {0} is already in flight")]
    ConflictError(String),

    /// One item of a listing could not be indexed.
    #[error("failed to index {item_id}: {reason}")]
    IndexPartialFailure { item_id: String, reason: String },

    /// No signing backend is present, or no identity is connected.
    #[error("no wallet available")]
    NoWalletAvailable,

    /// The identity lacks the timelock admin role.
    #[error("{0} is not a timelock admin")]
    NotAdmin(Address),

    /// Startup configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GovError {
    /// Wrap a failure to decode a contract response.
    pub fn malformed(method: &str, err: AbiError) -> Self {
        GovError::NetworkError(format!("malformed {} response: {}", method, err))
    }
}

impl From<RpcError> for GovError {
    fn from(err: RpcError) -> Self {
        if err.is_user_rejection() {
            return GovError::UserRejected;
        }
        if let Some(reason) = err.revert_reason() {
            return GovError::ContractRevert(reason);
        }
        GovError::NetworkError(err.to_string())
    }
}

impl From<TxError> for GovError {
    fn from(err: TxError) -> Self {
        match err {
            TxError::UserRejected => GovError::UserRejected,
            TxError::ContractRevert(reason) => GovError::ContractRevert(reason),
            TxError::Network(detail) => GovError::NetworkError(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::traits::{EXECUTION_REVERTED_CODE, USER_REJECTED_CODE};

    #[test]
    fn test_rpc_error_classification() {
        let rejected = RpcError::Rpc {
            code: USER_REJECTED_CODE,
            message: "User rejected the request.".to_string(),
            data: None,
        };
        assert_eq!(GovError::from(rejected), GovError::UserRejected);

        let reverted = RpcError::Rpc {
            code: EXECUTION_REVERTED_CODE,
            message: "execution reverted: Governor: unknown proposal id".to_string(),
            data: None,
        };
        assert!(matches!(
            GovError::from(reverted),
            GovError::ContractRevert(reason) if reason.contains("unknown proposal id")
        ));

        assert!(matches!(
            GovError::from(RpcError::Timeout),
            GovError::NetworkError(_)
        ));
    }

    #[test]
    fn test_tx_error_conversion() {
        assert_eq!(GovError::from(TxError::UserRejected), GovError::UserRejected);
        assert_eq!(
            GovError::from(TxError::ContractRevert("nope".to_string())),
            GovError::ContractRevert("nope".to_string())
        );
        assert_eq!(
            GovError::from(TxError::Network("down".to_string())),
            GovError::NetworkError("down".to_string())
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            GovError::ConflictError("42".to_string()).to_string(),
            "an action for proposal 42 is already in flight"
        );
        assert_eq!(
            GovError::IndexPartialFailure {
                item_id: "7".to_string(),
                reason: "timeout".to_string()
            }
            .to_string(),
            "failed to index 7: timeout"
        );
    }
}
