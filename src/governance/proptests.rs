//! Property-based tests for proposal identity and action gating.

use super::inflight::{InFlight, MutationKind};
use super::proposal::{
    description_hash, hash_proposal, ProposalAction, ProposalCall, ProposalId, ProposalState,
};
use alloy_primitives::{Address, Bytes, U256};
use proptest::prelude::*;
use std::collections::HashSet;

fn arb_state() -> impl Strategy<Value = ProposalState> {
    (0u8..8).prop_map(|ordinal| ProposalState::ALL[usize::from(ordinal)])
}

fn arb_call() -> impl Strategy<Value = ProposalCall> {
    (
        any::<[u8; 20]>(),
        any::<u64>(),
        prop::collection::vec(any::<u8>(), 0..68),
    )
        .prop_map(|(target, value, calldata)| ProposalCall {
            target: Address::from(target),
            value: U256::from(value),
            calldata: Bytes::from(calldata),
        })
}

proptest! {
    /// Property: offered actions follow the gating table exactly
    #[test]
    fn offered_actions_match_gating_table(state in arb_state()) {
        let offered: HashSet<_> = state.offered_actions().iter().copied().collect();
        let expected: HashSet<_> = match state {
            ProposalState::Active => [ProposalAction::VoteFor, ProposalAction::VoteAgainst].into(),
            ProposalState::Succeeded => [ProposalAction::Queue].into(),
            ProposalState::Queued => [ProposalAction::Execute].into(),
            _ => HashSet::new(),
        };
        prop_assert_eq!(offered, expected);
    }

    /// Property: ordinals are the contract's enum positions
    #[test]
    fn ordinal_identifies_state(state in arb_state()) {
        prop_assert_eq!(ProposalState::from_ordinal(state.ordinal()), Some(state));
    }

    /// Property: different call lists yield different proposal ids
    #[test]
    fn calls_change_proposal_id(
        calls in prop::collection::vec(arb_call(), 1..4),
        other in prop::collection::vec(arb_call(), 1..4),
        description in ".{0,64}",
    ) {
        prop_assume!(calls != other);
        let hash = description_hash(&description);
        prop_assert_ne!(hash_proposal(&calls, hash), hash_proposal(&other, hash));
    }

    /// Property: a different description yields a different proposal id
    #[test]
    fn description_changes_proposal_id(
        calls in prop::collection::vec(arb_call(), 1..4),
        description in "[a-z ]{1,32}",
        suffix in "[A-Z]{1,4}",
    ) {
        let original = hash_proposal(&calls, description_hash(&description));
        let edited = format!("{}{}", description, suffix);
        prop_assert_ne!(original, hash_proposal(&calls, description_hash(&edited)));
    }

    /// Property: ids parse back from their decimal rendering
    #[test]
    fn proposal_id_parses_from_display(limbs in any::<[u64; 4]>()) {
        let id = ProposalId(U256::from_limbs(limbs));
        prop_assert_eq!(id.to_string().parse::<ProposalId>(), Ok(id));
    }

    /// Property: the in-flight marker admits exactly one holder per id
    #[test]
    fn in_flight_admits_one_holder(ids in prop::collection::vec(0u64..8, 1..32)) {
        let in_flight = InFlight::new();
        let mut guards = Vec::new();
        let mut held = HashSet::new();

        for id in ids {
            let id = ProposalId(U256::from(id));
            let attempt = in_flight.try_begin(id, MutationKind::Vote);
            prop_assert_eq!(attempt.is_ok(), held.insert(id));
            if let Ok(guard) = attempt {
                guards.push(guard);
            }
        }

        drop(guards);
        prop_assert!(in_flight.is_idle());
    }
}
