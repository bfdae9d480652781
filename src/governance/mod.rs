//! Governance proposals: data model, listing and lifecycle.
//!
//! - `proposal`: ids, states, the action gating table and id hashing
//! - `indexer`: derives proposal snapshots from events plus live state
//! - `lifecycle`: vote/queue/execute/create through the submitter
//! - `command`: typed commands consumed by the lifecycle controller
//! - `inflight`: per-proposal mutual exclusion of mutations

pub mod command;
pub mod indexer;
pub mod inflight;
pub mod lifecycle;
pub mod proposal;

#[cfg(test)]
mod proptests;

pub use command::{CommandOutcome, ProposalCommand, ProposalDraft};
pub use indexer::ProposalIndexer;
pub use inflight::{InFlight, MutationKind};
pub use lifecycle::ProposalLifecycleController;
pub use proposal::{
    Proposal, ProposalAction, ProposalCall, ProposalId, ProposalState, VoteSupport,
};
