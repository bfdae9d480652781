//! Historical event scanning.
//!
//! A scan either issues one unbounded `eth_getLogs` query, or walks the
//! chain in fixed block-range pages up to the head observed when the scan
//! started. Logs come back in emission order either way.

use crate::error::GovResult;
use crate::ledger::{LedgerClient, Log, LogFilter};
use alloy_primitives::{Address, B256};
use tracing::debug;

/// Block range policy for event scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    pub from_block: u64,
    /// Blocks per `eth_getLogs` page; `None` queries the whole range at once.
    pub page_size: Option<u64>,
}

impl Default for ScanRange {
    fn default() -> Self {
        Self {
            from_block: 0,
            page_size: None,
        }
    }
}

/// Collect every log of `topic0` emitted by `address` within the range.
pub async fn scan_logs<L: LedgerClient>(
    ledger: &L,
    address: Address,
    topic0: B256,
    range: ScanRange,
) -> GovResult<Vec<Log>> {
    let mut logs = match range.page_size.filter(|size| *size > 0) {
        None => {
            ledger
                .get_logs(&LogFilter {
                    address,
                    topic0,
                    from_block: range.from_block,
                    to_block: None,
                })
                .await?
        }
        Some(page_size) => {
            let head = ledger.block_number().await?;
            let mut logs = Vec::new();
            let mut from = range.from_block;
            while from <= head {
                let to = from.saturating_add(page_size - 1).min(head);
                debug!(%address, from, to, "scanning log page");
                logs.extend(
                    ledger
                        .get_logs(&LogFilter {
                            address,
                            topic0,
                            from_block: from,
                            to_block: Some(to),
                        })
                        .await?,
                );
                from = to + 1;
            }
            logs
        }
    };

    logs.sort_by_key(|log| (log.block_number, log.log_index));
    Ok(logs)
}
