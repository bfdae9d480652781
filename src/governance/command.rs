//! Typed operator commands and their outcomes.

use super::proposal::{Proposal, ProposalId, VoteSupport};
use crate::certificates::Certificate;
use crate::error::GovResult;
use crate::listing::Listing;
use crate::tx::Confirmation;
use alloy_primitives::Address;

/// Operator-authored parameters for a new single-call proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalDraft {
    pub target: Address,
    /// Function name, or a full signature to pick an overload.
    pub function: String,
    /// Arguments as a JSON array, e.g. `["Alice", "Rust 101", "A", "2024-06-01"]`.
    pub args_json: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalCommand {
    CastVote { id: ProposalId, support: VoteSupport },
    Queue(Proposal),
    Execute(Proposal),
    Create(ProposalDraft),
}

impl ProposalCommand {
    /// Proposal the command mutates; `None` for creation, whose id is derived.
    pub fn proposal_id(&self) -> Option<ProposalId> {
        match self {
            ProposalCommand::CastVote { id, .. } => Some(*id),
            ProposalCommand::Queue(proposal) | ProposalCommand::Execute(proposal) => {
                Some(proposal.id)
            }
            ProposalCommand::Create(_) => None,
        }
    }
}

/// A confirmed mutation and the listings fetched after it.
#[derive(Debug)]
pub struct CommandOutcome {
    /// Id of the proposal the command acted on (or created).
    pub proposal_id: ProposalId,
    pub confirmation: Confirmation,
    /// The refetch can fail on its own without undoing the mutation.
    pub refresh: GovResult<Listing<Proposal>>,
    /// Refetched only after an execute, which may have issued certificates.
    pub certificates: Option<GovResult<Listing<Certificate>>>,
}
