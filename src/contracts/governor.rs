//! Governor contract handle.

use super::{events, read, ContractCall, ScanRange};
use crate::abi::{self, AbiError, ParamType, Token};
use crate::error::{GovError, GovResult};
use crate::governance::proposal::{
    call_arrays, ProposalCall, ProposalId, ProposalState, VoteSupport,
};
use crate::ledger::{LedgerClient, Log};
use alloy_primitives::{Address, Bytes, B256, U256};

pub const PROPOSE: &str = "propose(address[],uint256[],bytes[],string)";
pub const QUEUE: &str = "queue(address[],uint256[],bytes[],bytes32)";
pub const EXECUTE: &str = "execute(address[],uint256[],bytes[],bytes32)";
pub const CAST_VOTE: &str = "castVote(uint256,uint8)";
pub const STATE: &str = "state(uint256)";
pub const PROPOSAL_CREATED: &str =
    "ProposalCreated(uint256,address,address[],uint256[],string[],bytes[],uint256,uint256,string)";

/// Field layout of `ProposalCreated` (no indexed fields).
fn proposal_created_fields() -> Vec<ParamType> {
    vec![
        ParamType::Uint(256),
        ParamType::Address,
        ParamType::Array(Box::new(ParamType::Address)),
        ParamType::Array(Box::new(ParamType::Uint(256))),
        ParamType::Array(Box::new(ParamType::String)),
        ParamType::Array(Box::new(ParamType::Bytes)),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::String,
    ]
}

pub fn proposal_created_topic() -> B256 {
    abi::event_topic(PROPOSAL_CREATED)
}

/// Decoded `ProposalCreated` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalCreated {
    pub proposal_id: ProposalId,
    pub proposer: Address,
    pub calls: Vec<ProposalCall>,
    pub vote_start: U256,
    pub vote_end: U256,
    pub description: String,
}

impl ProposalCreated {
    pub fn decode(log: &Log) -> Result<Self, AbiError> {
        let malformed = |what: &str| AbiError::Malformed(format!("ProposalCreated {}", what));
        let mut fields = abi::decode(&proposal_created_fields(), &log.data)?.into_iter();
        let mut next = || fields.next().ok_or_else(|| malformed("field count"));

        let proposal_id = next()?.into_uint().ok_or_else(|| malformed("proposalId"))?;
        let proposer = next()?.into_address().ok_or_else(|| malformed("proposer"))?;
        let targets = next()?.into_array().ok_or_else(|| malformed("targets"))?;
        let values = next()?.into_array().ok_or_else(|| malformed("values"))?;
        let _signatures = next()?;
        let calldatas = next()?.into_array().ok_or_else(|| malformed("calldatas"))?;
        let vote_start = next()?.into_uint().ok_or_else(|| malformed("voteStart"))?;
        let vote_end = next()?.into_uint().ok_or_else(|| malformed("voteEnd"))?;
        let description = next()?.into_string().ok_or_else(|| malformed("description"))?;

        if targets.len() != values.len() || targets.len() != calldatas.len() {
            return Err(malformed("array lengths"));
        }

        let calls = targets
            .into_iter()
            .zip(values)
            .zip(calldatas)
            .map(|((target, value), calldata)| {
                Some(ProposalCall {
                    target: target.into_address()?,
                    value: value.into_uint()?,
                    calldata: Bytes::from(calldata.into_bytes()?),
                })
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| malformed("call triple"))?;

        Ok(Self {
            proposal_id: ProposalId(proposal_id),
            proposer,
            calls,
            vote_start,
            vote_end,
            description,
        })
    }

    /// Event data as the governor emits it.
    pub fn encode_data(&self) -> Vec<u8> {
        let [targets, values, calldatas] = call_arrays(&self.calls);
        let signatures = Token::Array(vec![Token::String(String::new()); self.calls.len()]);
        abi::encode(&[
            Token::Uint(self.proposal_id.0),
            Token::Address(self.proposer),
            targets,
            values,
            signatures,
            calldatas,
            Token::Uint(self.vote_start),
            Token::Uint(self.vote_end),
            Token::String(self.description.clone()),
        ])
    }
}

/// Governor bound to a ledger connection.
pub struct Governor<'a, L> {
    ledger: &'a L,
    address: Address,
}

impl<'a, L: LedgerClient> Governor<'a, L> {
    pub fn new(ledger: &'a L, address: Address) -> Self {
        Self { ledger, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Current state of a proposal, queried live.
    pub async fn state(&self, id: ProposalId) -> GovResult<ProposalState> {
        let data = abi::encode_call(abi::selector(STATE), &[Token::Uint(id.0)]);
        let output = read(self.ledger, self.address, data).await?;
        let ordinal = abi::decode(&[ParamType::Uint(8)], &output)
            .map_err(|e| GovError::malformed("state", e))?
            .pop()
            .and_then(Token::into_uint)
            .ok_or_else(|| GovError::NetworkError("empty state response".to_string()))?;

        ProposalState::ALL
            .into_iter()
            .find(|state| U256::from(state.ordinal()) == ordinal)
            .ok_or_else(|| GovError::NetworkError(format!("unknown proposal state {}", ordinal)))
    }

    /// Every `ProposalCreated` log within the scan range.
    pub async fn proposal_created_logs(&self, range: ScanRange) -> GovResult<Vec<Log>> {
        events::scan_logs(self.ledger, self.address, proposal_created_topic(), range).await
    }

    pub fn propose(&self, calls: &[ProposalCall], description: &str) -> ContractCall {
        let [targets, values, calldatas] = call_arrays(calls);
        let tokens = [targets, values, calldatas, Token::String(description.to_string())];
        ContractCall::new(self.address, "propose", abi::encode_call(abi::selector(PROPOSE), &tokens))
    }

    pub fn queue(&self, calls: &[ProposalCall], description_hash: B256) -> ContractCall {
        ContractCall::new(
            self.address,
            "queue",
            encode_lifecycle_call(QUEUE, calls, description_hash),
        )
    }

    pub fn execute(&self, calls: &[ProposalCall], description_hash: B256) -> ContractCall {
        ContractCall::new(
            self.address,
            "execute",
            encode_lifecycle_call(EXECUTE, calls, description_hash),
        )
    }

    pub fn cast_vote(&self, id: ProposalId, support: VoteSupport) -> ContractCall {
        let tokens = [Token::Uint(id.0), Token::Uint(U256::from(support.as_u8()))];
        ContractCall::new(
            self.address,
            "castVote",
            abi::encode_call(abi::selector(CAST_VOTE), &tokens),
        )
    }
}

fn encode_lifecycle_call(signature: &str, calls: &[ProposalCall], description_hash: B256) -> Vec<u8> {
    let [targets, values, calldatas] = call_arrays(calls);
    let tokens = [
        targets,
        values,
        calldatas,
        Token::FixedBytes(description_hash.to_vec()),
    ];
    abi::encode_call(abi::selector(signature), &tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::proposal::{description_hash, hash_proposal};

    fn sample_event() -> ProposalCreated {
        let calls = vec![ProposalCall {
            target: Address::repeat_byte(0x10),
            value: U256::ZERO,
            calldata: Bytes::from(vec![0xaa, 0xbb, 0xcc, 0xdd, 0x01]),
        }];
        let description = "Issue certificate to Alice".to_string();
        ProposalCreated {
            proposal_id: hash_proposal(&calls, description_hash(&description)),
            proposer: Address::repeat_byte(0x01),
            calls,
            vote_start: U256::from(10u64),
            vote_end: U256::from(60u64),
            description,
        }
    }

    fn as_log(event: &ProposalCreated) -> Log {
        Log {
            address: Address::repeat_byte(0x20),
            topics: vec![proposal_created_topic()],
            data: Bytes::from(event.encode_data()),
            block_number: 3,
            log_index: 0,
        }
    }

    #[test]
    fn test_decode_proposal_created() {
        let event = sample_event();
        let decoded = ProposalCreated::decode(&as_log(&event)).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_decode_truncated_event_fails() {
        let event = sample_event();
        let mut log = as_log(&event);
        log.data = Bytes::from(log.data[..100].to_vec());
        assert!(ProposalCreated::decode(&log).is_err());
    }

    #[test]
    fn test_queue_and_execute_differ_only_in_selector() {
        let event = sample_event();
        let hash = description_hash(&event.description);
        let queue = encode_lifecycle_call(QUEUE, &event.calls, hash);
        let execute = encode_lifecycle_call(EXECUTE, &event.calls, hash);

        assert_ne!(queue[..4], execute[..4]);
        assert_eq!(queue[4..], execute[4..]);
    }

    #[test]
    fn test_lifecycle_call_carries_description_hash() {
        let event = sample_event();
        let hash = description_hash(&event.description);
        let data = encode_lifecycle_call(QUEUE, &event.calls, hash);

        let decoded = abi::Function::parse(QUEUE).unwrap().decode_input(&data).unwrap();
        assert_eq!(decoded[3], Token::FixedBytes(hash.to_vec()));
    }
}
