//! JSON-RPC 2.0 ledger connection over HTTP.
//!
//! Transactions are signed by the node-managed account (`eth_sendTransaction`),
//! so no key material ever passes through this process.

use super::traits::*;
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// HTTP JSON-RPC ledger client.
pub struct HttpLedger {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Value,
    error: Option<ErrorObject>,
}

#[derive(Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: Option<String>,
    log_index: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: B256,
    block_number: Option<String>,
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

impl HttpLedger {
    /// Create a client for the node at `url`.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> RpcResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, "rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| RpcError::Decode(format!("{} response: {}", method, e)))?;

        if let Some(error) = envelope.error {
            debug!(method, id, code = error.code, message = %error.message, "rpc error");
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
                data: revert_data(&error.data),
            });
        }

        serde_json::from_value(envelope.result)
            .map_err(|e| RpcError::Decode(format!("{} result: {}", method, e)))
    }
}

fn map_transport(err: reqwest::Error) -> RpcError {
    if err.is_timeout() {
        RpcError::Timeout
    } else {
        RpcError::Transport(err.to_string())
    }
}

/// Nodes nest revert data differently: a bare hex string, or `{ data: ... }`.
fn revert_data(value: &Value) -> Option<Bytes> {
    match value {
        Value::String(text) => {
            let digits = text.strip_prefix("0x")?;
            hex::decode(digits).ok().map(Bytes::from)
        }
        Value::Object(map) => map.get("data").and_then(revert_data),
        _ => None,
    }
}

fn parse_quantity(text: &str) -> RpcResult<u64> {
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::Decode(format!("quantity {:?} lacks 0x prefix", text)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Decode(format!("invalid quantity {:?}: {}", text, e)))
}

fn quantity(value: u64) -> String {
    format!("{:#x}", value)
}

fn call_object(request: &CallRequest) -> Value {
    let mut object = json!({
        "to": request.to,
        "data": request.data,
    });
    if let Some(from) = request.from {
        object["from"] = json!(from);
    }
    if !request.value.is_zero() {
        object["value"] = json!(format!("0x{:x}", request.value));
    }
    object
}

impl RawLog {
    fn into_log(self) -> RpcResult<Log> {
        Ok(Log {
            address: self.address,
            topics: self.topics,
            data: self.data,
            block_number: self.block_number.as_deref().map(parse_quantity).transpose()?.unwrap_or(0),
            log_index: self.log_index.as_deref().map(parse_quantity).transpose()?.unwrap_or(0),
        })
    }
}

impl RawReceipt {
    fn into_receipt(self) -> RpcResult<Receipt> {
        // Pre-Byzantium receipts carry no status; treat them as success.
        let status = match self.status.as_deref() {
            Some(status) => parse_quantity(status)? == 1,
            None => true,
        };
        Ok(Receipt {
            transaction_hash: self.transaction_hash,
            block_number: self.block_number.as_deref().map(parse_quantity).transpose()?.unwrap_or(0),
            status,
            logs: self
                .logs
                .into_iter()
                .map(RawLog::into_log)
                .collect::<RpcResult<Vec<_>>>()?,
        })
    }
}

#[async_trait]
impl LedgerClient for HttpLedger {
    async fn accounts(&self) -> RpcResult<Vec<Address>> {
        self.request("eth_accounts", json!([])).await
    }

    async fn request_accounts(&self) -> RpcResult<Vec<Address>> {
        match self.request("eth_requestAccounts", json!([])).await {
            Err(RpcError::Rpc { code, .. }) if code == METHOD_NOT_FOUND_CODE => {
                self.accounts().await
            }
            other => other,
        }
    }

    async fn call(&self, request: &CallRequest) -> RpcResult<Bytes> {
        self.request("eth_call", json!([call_object(request), "latest"]))
            .await
    }

    async fn send_transaction(&self, request: &CallRequest) -> RpcResult<B256> {
        self.request("eth_sendTransaction", json!([call_object(request)]))
            .await
    }

    async fn transaction_receipt(&self, hash: &B256) -> RpcResult<Option<Receipt>> {
        let raw: Option<RawReceipt> = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        raw.map(RawReceipt::into_receipt).transpose()
    }

    async fn block_number(&self) -> RpcResult<u64> {
        let raw: String = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity(&raw)
    }

    async fn get_logs(&self, filter: &LogFilter) -> RpcResult<Vec<Log>> {
        let to_block = filter
            .to_block
            .map(quantity)
            .unwrap_or_else(|| "latest".to_string());
        let raw: Vec<RawLog> = self
            .request(
                "eth_getLogs",
                json!([{
                    "address": filter.address,
                    "topics": [filter.topic0],
                    "fromBlock": quantity(filter.from_block),
                    "toBlock": to_block,
                }]),
            )
            .await?;
        raw.into_iter().map(RawLog::into_log).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert!(parse_quantity("26").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_call_object_omits_empty_fields() {
        let request = CallRequest {
            from: None,
            to: Address::repeat_byte(0x22),
            data: Bytes::from(vec![0x01, 0x02]),
            value: U256::ZERO,
        };
        let object = call_object(&request);
        assert!(object.get("from").is_none());
        assert!(object.get("value").is_none());
        assert_eq!(object["data"], json!("0x0102"));
    }

    #[test]
    fn test_call_object_includes_sender_and_value() {
        let request = CallRequest {
            from: Some(Address::repeat_byte(0x33)),
            to: Address::repeat_byte(0x22),
            data: Bytes::new(),
            value: U256::from(16u64),
        };
        let object = call_object(&request);
        assert!(object.get("from").is_some());
        assert_eq!(object["value"], json!("0x10"));
    }

    #[test]
    fn test_revert_data_shapes() {
        assert_eq!(
            revert_data(&json!("0x08c379a0")),
            Some(Bytes::from(vec![0x08, 0xc3, 0x79, 0xa0]))
        );
        assert_eq!(
            revert_data(&json!({"message": "reverted", "data": "0xbeef"})),
            Some(Bytes::from(vec![0xbe, 0xef]))
        );
        assert_eq!(revert_data(&json!(null)), None);
        assert_eq!(revert_data(&json!("Reverted")), None);
    }

    #[test]
    fn test_receipt_decoding() {
        let raw: RawReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "blockNumber": "0x10",
            "status": "0x0",
            "logs": [{
                "address": "0x2222222222222222222222222222222222222222",
                "topics": [format!("0x{}", "cd".repeat(32))],
                "data": "0x",
                "blockNumber": "0x10",
                "logIndex": "0x2"
            }]
        }))
        .unwrap();

        let receipt = raw.into_receipt().unwrap();
        assert_eq!(receipt.block_number, 16);
        assert!(!receipt.status);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].log_index, 2);
    }

    #[test]
    fn test_http_ledger_construction() {
        let ledger = HttpLedger::new("http://127.0.0.1:8545", Duration::from_secs(5)).unwrap();
        assert_eq!(ledger.url(), "http://127.0.0.1:8545");
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        // Port 9 (discard) on localhost is not an RPC endpoint.
        let ledger = HttpLedger::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result = ledger.block_number().await;
        assert!(matches!(
            result,
            Err(RpcError::Transport(_)) | Err(RpcError::Timeout)
        ));
    }
}
