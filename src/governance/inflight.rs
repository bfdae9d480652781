//! Per-proposal in-flight marker.
//!
//! At most one mutating action may be pending for a proposal id. A second
//! attempt fails immediately with `ConflictError`; the marker is cleared when
//! the guard for the first action is dropped, whatever its outcome.

use super::proposal::ProposalId;
use crate::error::{GovError, GovResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Kind of mutation holding a proposal's marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Vote,
    Queue,
    Execute,
    Create,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MutationKind::Vote => "vote",
            MutationKind::Queue => "queue",
            MutationKind::Execute => "execute",
            MutationKind::Create => "create",
        };
        f.write_str(label)
    }
}

#[derive(Default)]
pub struct InFlight {
    active: Mutex<HashMap<ProposalId, MutationKind>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ProposalId, MutationKind>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the marker for `id`, or fail with `ConflictError`.
    pub fn try_begin(&self, id: ProposalId, kind: MutationKind) -> GovResult<InFlightGuard<'_>> {
        let mut active = self.lock();
        if let Some(current) = active.get(&id) {
            debug!(proposal_id = %id, %current, attempted = %kind, "rejecting concurrent action");
            return Err(GovError::ConflictError(id.to_string()));
        }
        active.insert(id, kind);
        Ok(InFlightGuard { owner: self, id })
    }

    pub fn is_idle(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Releases the proposal's marker on drop.
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    id: ProposalId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn id(n: u64) -> ProposalId {
        ProposalId(U256::from(n))
    }

    #[test]
    fn test_second_action_conflicts() {
        let in_flight = InFlight::new();
        let guard = in_flight.try_begin(id(1), MutationKind::Vote).unwrap();

        assert_eq!(
            in_flight.try_begin(id(1), MutationKind::Queue).err(),
            Some(GovError::ConflictError("1".to_string()))
        );
        assert!(!in_flight.is_idle());

        drop(guard);
        assert!(in_flight.try_begin(id(1), MutationKind::Queue).is_ok());
    }

    #[test]
    fn test_distinct_proposals_do_not_conflict() {
        let in_flight = InFlight::new();
        let _first = in_flight.try_begin(id(1), MutationKind::Vote).unwrap();
        let _second = in_flight.try_begin(id(2), MutationKind::Vote).unwrap();
        assert!(!in_flight.is_idle());
    }

    #[test]
    fn test_guard_released_on_drop() {
        let in_flight = InFlight::new();
        {
            let _guard = in_flight.try_begin(id(3), MutationKind::Execute).unwrap();
        }
        assert!(in_flight.is_idle());
        assert!(in_flight.try_begin(id(3), MutationKind::Vote).is_ok());
    }
}
