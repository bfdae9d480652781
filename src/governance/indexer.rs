//! Proposal listing.
//!
//! Every `ProposalCreated` event is paired with a live `state` query. The
//! state queries run concurrently; a failed query omits that proposal and
//! records a per-item failure instead of failing the listing.

use super::proposal::{Proposal, ProposalId};
use crate::contracts::governor::ProposalCreated;
use crate::contracts::{ContractGateway, ScanRange};
use crate::error::GovResult;
use crate::ledger::LedgerClient;
use crate::listing::{IndexFailure, Listing};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ProposalIndexer<L> {
    gateway: Arc<ContractGateway<L>>,
    range: ScanRange,
}

impl<L: LedgerClient> ProposalIndexer<L> {
    pub fn new(gateway: Arc<ContractGateway<L>>, range: ScanRange) -> Self {
        Self { gateway, range }
    }

    /// All proposals in emission order, with freshly queried states.
    ///
    /// Fails as a whole only when the event scan itself fails.
    pub async fn list_proposals(&self) -> GovResult<Listing<Proposal>> {
        let contracts = self.gateway.bind(None);
        let governor = contracts.governor();
        let logs = governor.proposal_created_logs(self.range).await?;

        let mut listing = Listing::default();
        let mut seen = HashSet::new();
        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            match ProposalCreated::decode(log) {
                Ok(event) => {
                    if seen.insert(event.proposal_id) {
                        events.push(event);
                    }
                }
                Err(e) => {
                    let item_id = format!("log {}:{}", log.block_number, log.log_index);
                    warn!(%item_id, error = %e, "undecodable ProposalCreated log");
                    listing.failures.push(IndexFailure::new(item_id, e.to_string()));
                }
            }
        }

        let states = join_all(events.iter().map(|event| governor.state(event.proposal_id))).await;

        for (event, state) in events.into_iter().zip(states) {
            match state {
                Ok(state) => listing.items.push(Proposal {
                    id: event.proposal_id,
                    description: event.description,
                    state,
                    calls: event.calls,
                }),
                Err(e) => {
                    warn!(proposal_id = %event.proposal_id, error = %e, "state query failed");
                    listing
                        .failures
                        .push(IndexFailure::new(event.proposal_id.to_string(), e.to_string()));
                }
            }
        }

        debug!(
            proposals = listing.items.len(),
            failures = listing.failures.len(),
            "proposal listing refreshed"
        );
        Ok(listing)
    }

    /// One proposal from a fresh listing.
    pub async fn find(&self, id: ProposalId) -> GovResult<Option<Proposal>> {
        let listing = self.list_proposals().await?;
        if let Some(failure) = listing
            .failures
            .iter()
            .find(|failure| failure.item_id == id.to_string())
        {
            return Err(failure.clone().into());
        }
        Ok(listing.items.into_iter().find(|proposal| proposal.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::governor;
    use crate::error::GovError;
    use crate::governance::proposal::{ProposalCall, ProposalState};
    use crate::ledger::mock::MockLedger;
    use alloy_primitives::{Address, Bytes, U256};

    fn call(ledger: &MockLedger, tag: u8) -> Vec<ProposalCall> {
        vec![ProposalCall {
            target: ledger.address_book().credential,
            value: U256::ZERO,
            calldata: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef, tag]),
        }]
    }

    fn indexer(ledger: &Arc<MockLedger>) -> ProposalIndexer<MockLedger> {
        let gateway = Arc::new(ContractGateway::new(ledger.clone(), ledger.address_book()));
        ProposalIndexer::new(gateway, ScanRange::default())
    }

    #[tokio::test]
    async fn test_lists_in_emission_order_with_live_state() {
        let ledger = Arc::new(MockLedger::new());
        let proposer = Address::repeat_byte(0xa1);
        let first = ledger.seed_proposal(proposer, call(&ledger, 1), "first", ProposalState::Queued);
        let second = ledger.seed_proposal(proposer, call(&ledger, 2), "second", ProposalState::Active);

        let listing = indexer(&ledger).list_proposals().await.unwrap();
        assert!(listing.is_complete());
        let ids: Vec<_> = listing.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(listing.items[0].state, ProposalState::Queued);
        assert_eq!(listing.items[1].description, "second");
        assert_eq!(listing.items[1].calls, call(&ledger, 2));
    }

    #[tokio::test]
    async fn test_state_is_requeried_each_listing() {
        let ledger = Arc::new(MockLedger::new());
        let id = ledger.seed_proposal(
            Address::repeat_byte(0xa1),
            call(&ledger, 1),
            "p",
            ProposalState::Pending,
        );
        let indexer = indexer(&ledger);

        assert_eq!(indexer.list_proposals().await.unwrap().items[0].state, ProposalState::Pending);
        ledger.set_proposal_state(id, ProposalState::Active);
        assert_eq!(indexer.list_proposals().await.unwrap().items[0].state, ProposalState::Active);
    }

    #[tokio::test]
    async fn test_failed_state_query_is_isolated() {
        let ledger = Arc::new(MockLedger::new());
        let proposer = Address::repeat_byte(0xa1);
        let healthy = ledger.seed_proposal(proposer, call(&ledger, 1), "ok", ProposalState::Active);
        let broken = ledger.seed_proposal(proposer, call(&ledger, 2), "broken", ProposalState::Active);
        ledger.fail_state_query(broken);

        let indexer = indexer(&ledger);
        let listing = indexer.list_proposals().await.unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].id, healthy);
        assert_eq!(listing.failures.len(), 1);
        assert_eq!(listing.failures[0].item_id, broken.to_string());

        assert!(matches!(
            indexer.find(broken).await,
            Err(GovError::IndexPartialFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_undecodable_log_is_reported() {
        let ledger = Arc::new(MockLedger::new());
        ledger.seed_proposal(Address::repeat_byte(0xa1), call(&ledger, 1), "ok", ProposalState::Active);
        ledger.emit_raw_log(
            ledger.address_book().governor,
            vec![governor::proposal_created_topic()],
            vec![0u8; 7],
        );

        let listing = indexer(&ledger).list_proposals().await.unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.failures.len(), 1);
        assert!(listing.failures[0].item_id.starts_with("log "));
    }

    #[tokio::test]
    async fn test_overflowing_offset_in_log_is_reported() {
        let ledger = Arc::new(MockLedger::new());
        let healthy = ledger.seed_proposal(
            Address::repeat_byte(0xa1),
            call(&ledger, 1),
            "ok",
            ProposalState::Active,
        );

        let event = ProposalCreated {
            proposal_id: ProposalId(U256::from(7u64)),
            proposer: Address::repeat_byte(0xa1),
            calls: call(&ledger, 2),
            vote_start: U256::from(1u64),
            vote_end: U256::from(2u64),
            description: "hostile".to_string(),
        };
        let mut data = event.encode_data();
        // Head slot 5 holds the offset of the calldatas array; its first
        // element offset follows the length word.
        let head = 5 * 32;
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&data[head + 24..head + 32]);
        let element = u64::from_be_bytes(offset) as usize + 32;
        data[element..element + 32].copy_from_slice(&U256::from(u64::MAX).to_be_bytes::<32>());
        ledger.emit_raw_log(
            ledger.address_book().governor,
            vec![governor::proposal_created_topic()],
            data,
        );

        let listing = indexer(&ledger).list_proposals().await.unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].id, healthy);
        assert_eq!(listing.failures.len(), 1);
        assert!(listing.failures[0].item_id.starts_with("log "));
    }

    #[tokio::test]
    async fn test_duplicate_created_events_list_once() {
        let ledger = Arc::new(MockLedger::new());
        let proposer = Address::repeat_byte(0xa1);
        let id = ledger.seed_proposal(proposer, call(&ledger, 1), "again", ProposalState::Active);
        let replay = ProposalCreated {
            proposal_id: id,
            proposer,
            calls: call(&ledger, 1),
            vote_start: U256::from(1u64),
            vote_end: U256::from(2u64),
            description: "again".to_string(),
        };
        ledger.emit_raw_log(
            ledger.address_book().governor,
            vec![governor::proposal_created_topic()],
            replay.encode_data(),
        );

        let listing = indexer(&ledger).list_proposals().await.unwrap();
        assert!(listing.is_complete());
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].id, id);
    }

    #[tokio::test]
    async fn test_ids_are_distinct_and_stable() {
        let ledger = Arc::new(MockLedger::new());
        let proposer = Address::repeat_byte(0xa1);
        for (tag, state) in [
            (1, ProposalState::Pending),
            (2, ProposalState::Active),
            (3, ProposalState::Defeated),
        ] {
            ledger.seed_proposal(proposer, call(&ledger, tag), "same description", state);
        }
        let indexer = indexer(&ledger);

        let ids = |listing: Listing<Proposal>| -> Vec<ProposalId> {
            listing.items.iter().map(|p| p.id).collect()
        };
        let first = ids(indexer.list_proposals().await.unwrap());
        let second = ids(indexer.list_proposals().await.unwrap());

        assert_eq!(first.len(), 3);
        assert_eq!(first.iter().collect::<HashSet<_>>().len(), first.len());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_scan_failure_fails_listing() {
        let ledger = Arc::new(MockLedger::new());
        ledger.set_offline(true);
        assert!(matches!(
            indexer(&ledger).list_proposals().await,
            Err(GovError::NetworkError(_))
        ));
    }

    #[tokio::test]
    async fn test_find_unknown_is_none() {
        let ledger = Arc::new(MockLedger::new());
        assert_eq!(
            indexer(&ledger).find(ProposalId(U256::from(5u64))).await.unwrap(),
            None
        );
    }
}
