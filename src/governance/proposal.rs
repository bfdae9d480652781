//! Proposal data model and the action gating table.

use crate::abi::{self, Token};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Governance-assigned proposal identifier (a 256-bit integer).
///
/// Displayed and serialized as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProposalId(pub U256);

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProposalId {
    type Err = String;

    /// Accepts decimal or 0x-prefixed hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x") {
            Some(digits) => U256::from_str_radix(digits, 16),
            None => U256::from_str_radix(s, 10),
        };
        parsed
            .map(ProposalId)
            .map_err(|e| format!("invalid proposal id {:?}: {}", s, e))
    }
}

impl Serialize for ProposalId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ProposalId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Governor proposal state, in the contract's ordinal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    Pending = 0,
    Active = 1,
    Canceled = 2,
    Defeated = 3,
    Succeeded = 4,
    Queued = 5,
    Expired = 6,
    Executed = 7,
}

impl ProposalState {
    pub const ALL: [ProposalState; 8] = [
        ProposalState::Pending,
        ProposalState::Active,
        ProposalState::Canceled,
        ProposalState::Defeated,
        ProposalState::Succeeded,
        ProposalState::Queued,
        ProposalState::Expired,
        ProposalState::Executed,
    ];

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal)).copied()
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Actions worth offering for a proposal in this state.
    ///
    /// This is a usability guard only; the governor contract remains the
    /// authority on whether a transition is legal.
    pub fn offered_actions(self) -> &'static [ProposalAction] {
        match self {
            ProposalState::Active => &[ProposalAction::VoteFor, ProposalAction::VoteAgainst],
            ProposalState::Succeeded => &[ProposalAction::Queue],
            ProposalState::Queued => &[ProposalAction::Execute],
            _ => &[],
        }
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Binary vote signal (the governor's `support` argument).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteSupport {
    Against = 0,
    For = 1,
}

impl VoteSupport {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl FromStr for VoteSupport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "for" | "yes" | "1" => Ok(VoteSupport::For),
            "against" | "no" | "0" => Ok(VoteSupport::Against),
            other => Err(format!("invalid vote {:?}: expected for or against", other)),
        }
    }
}

/// Operator action on an existing proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalAction {
    VoteFor,
    VoteAgainst,
    Queue,
    Execute,
}

impl fmt::Display for ProposalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProposalAction::VoteFor => "vote for",
            ProposalAction::VoteAgainst => "vote against",
            ProposalAction::Queue => "queue",
            ProposalAction::Execute => "execute",
        };
        f.write_str(label)
    }
}

/// One (target, value, calldata) triple of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalCall {
    pub target: Address,
    pub value: U256,
    pub calldata: Bytes,
}

/// Snapshot of a proposal at the time of the last fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub description: String,
    pub state: ProposalState,
    /// Calls recorded at creation; queue and execute must replay them exactly.
    pub calls: Vec<ProposalCall>,
}

impl Proposal {
    pub fn offered_actions(&self) -> &'static [ProposalAction] {
        self.state.offered_actions()
    }
}

/// keccak256 of the description's UTF-8 bytes, as the governor computes it.
pub fn description_hash(description: &str) -> B256 {
    keccak256(description.as_bytes())
}

/// Split calls into the parallel target/value/calldata arrays.
pub fn call_arrays(calls: &[ProposalCall]) -> [Token; 3] {
    [
        Token::Array(calls.iter().map(|c| Token::Address(c.target)).collect()),
        Token::Array(calls.iter().map(|c| Token::Uint(c.value)).collect()),
        Token::Array(
            calls
                .iter()
                .map(|c| Token::Bytes(c.calldata.to_vec()))
                .collect(),
        ),
    ]
}

/// Proposal id the governor derives from the calls and description hash.
pub fn hash_proposal(calls: &[ProposalCall], description_hash: B256) -> ProposalId {
    let [targets, values, calldatas] = call_arrays(calls);
    let encoded = abi::encode(&[
        targets,
        values,
        calldatas,
        Token::FixedBytes(description_hash.to_vec()),
    ]);
    ProposalId(U256::from_be_bytes(keccak256(encoded).0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gating_table() {
        use ProposalAction::*;
        use ProposalState::*;

        let expected: [(ProposalState, &[ProposalAction]); 8] = [
            (Pending, &[]),
            (Active, &[VoteFor, VoteAgainst]),
            (Canceled, &[]),
            (Defeated, &[]),
            (Succeeded, &[Queue]),
            (Queued, &[Execute]),
            (Expired, &[]),
            (Executed, &[]),
        ];

        for (state, actions) in expected {
            assert_eq!(state.offered_actions(), actions, "state {}", state);
        }
    }

    #[test]
    fn test_state_ordinals() {
        for (i, state) in ProposalState::ALL.iter().enumerate() {
            assert_eq!(usize::from(state.ordinal()), i);
            assert_eq!(ProposalState::from_ordinal(i as u8), Some(*state));
        }
        assert_eq!(ProposalState::from_ordinal(8), None);
    }

    #[test]
    fn test_proposal_id_parse_and_display() {
        let id: ProposalId = "1234567890123456789012345678901234567890".parse().unwrap();
        assert_eq!(id.to_string(), "1234567890123456789012345678901234567890");

        let hex: ProposalId = "0xff".parse().unwrap();
        assert_eq!(hex, ProposalId(U256::from(255u64)));

        assert!("not-a-number".parse::<ProposalId>().is_err());
    }

    #[test]
    fn test_proposal_id_serializes_as_string() {
        let id = ProposalId(U256::from(42u64));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
        let back: ProposalId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_vote_support_parse() {
        assert_eq!("for".parse::<VoteSupport>().unwrap(), VoteSupport::For);
        assert_eq!("Against".parse::<VoteSupport>().unwrap(), VoteSupport::Against);
        assert_eq!(VoteSupport::For.as_u8(), 1);
        assert_eq!(VoteSupport::Against.as_u8(), 0);
        assert!("abstain".parse::<VoteSupport>().is_err());
    }

    #[test]
    fn test_description_hash_is_keccak_of_text() {
        // keccak256("") is a well-known constant
        assert_eq!(
            description_hash("").to_string(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_ne!(
            description_hash("Issue certificate"),
            description_hash("Issue certificate ")
        );
    }

    #[test]
    fn test_hash_proposal_depends_on_every_input() {
        let call = ProposalCall {
            target: Address::repeat_byte(0x44),
            value: U256::ZERO,
            calldata: Bytes::from(vec![1, 2, 3, 4]),
        };
        let base = hash_proposal(&[call.clone()], description_hash("a"));

        assert_eq!(base, hash_proposal(&[call.clone()], description_hash("a")));
        assert_ne!(base, hash_proposal(&[call.clone()], description_hash("b")));

        let mut other = call.clone();
        other.calldata = Bytes::new();
        assert_ne!(base, hash_proposal(&[other], description_hash("a")));
    }
}
