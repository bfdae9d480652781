//! Ledger node connection.
//!
//! - `traits`: the `LedgerClient` abstraction and its wire-level types
//! - `rpc`: JSON-RPC over HTTP against a node
//! - `mock`: in-memory chain simulating the four governance contracts

pub mod mock;
pub mod rpc;
pub mod traits;

pub use mock::MockLedger;
pub use rpc::HttpLedger;
pub use traits::{CallRequest, LedgerClient, Log, LogFilter, Receipt, RpcError, RpcResult};
