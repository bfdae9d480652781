//! Proposal lifecycle: vote, queue, execute and create.
//!
//! The controller does not decide whether a transition is legal; the
//! governor and timelock do. It only guards against two concurrent actions
//! on the same proposal, validates operator input before touching the
//! network, and refetches the whole listing after every confirmed mutation.

use super::command::{CommandOutcome, ProposalCommand, ProposalDraft};
use super::indexer::ProposalIndexer;
use super::inflight::{InFlight, MutationKind};
use super::proposal::{
    description_hash, hash_proposal, Proposal, ProposalCall, ProposalId, VoteSupport,
};
use crate::abi::Interface;
use crate::certificates::CertificateCatalog;
use crate::contracts::{ContractCall, ContractGateway};
use crate::error::{GovError, GovResult};
use crate::ledger::LedgerClient;
use crate::listing::Listing;
use crate::session::{Identity, Session};
use crate::tx::TransactionSubmitter;
use alloy_primitives::{Address, Bytes, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct ProposalLifecycleController<L> {
    gateway: Arc<ContractGateway<L>>,
    session: Arc<Session>,
    submitter: Arc<TransactionSubmitter<L>>,
    indexer: ProposalIndexer<L>,
    catalog: Option<CertificateCatalog<L>>,
    /// Interfaces proposals may call, by target address.
    interfaces: HashMap<Address, Interface>,
    in_flight: InFlight,
}

impl<L: LedgerClient> ProposalLifecycleController<L> {
    pub fn new(
        gateway: Arc<ContractGateway<L>>,
        session: Arc<Session>,
        submitter: Arc<TransactionSubmitter<L>>,
        indexer: ProposalIndexer<L>,
    ) -> Self {
        Self {
            gateway,
            session,
            submitter,
            indexer,
            catalog: None,
            interfaces: HashMap::new(),
            in_flight: InFlight::new(),
        }
    }

    /// Register the callable surface of a proposal target.
    pub fn with_interface(mut self, target: Address, interface: Interface) -> Self {
        self.interfaces.insert(target, interface);
        self
    }

    /// Refetch certificates after every executed proposal.
    pub fn with_certificates(mut self, catalog: CertificateCatalog<L>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub async fn list_proposals(&self) -> GovResult<Listing<Proposal>> {
        self.indexer.list_proposals().await
    }

    /// A single proposal from a fresh listing, or `ValidationError` if unknown.
    pub async fn proposal(&self, id: ProposalId) -> GovResult<Proposal> {
        self.indexer
            .find(id)
            .await?
            .ok_or_else(|| GovError::ValidationError(format!("unknown proposal {}", id)))
    }

    pub async fn dispatch(&self, command: ProposalCommand) -> GovResult<CommandOutcome> {
        match command {
            ProposalCommand::CastVote { id, support } => self.cast_vote(id, support).await,
            ProposalCommand::Queue(proposal) => self.queue(&proposal).await,
            ProposalCommand::Execute(proposal) => self.execute(&proposal).await,
            ProposalCommand::Create(draft) => self.create_proposal(&draft).await,
        }
    }

    pub async fn cast_vote(&self, id: ProposalId, support: VoteSupport) -> GovResult<CommandOutcome> {
        let contracts = self.gateway.bind(self.session.identity());
        let call = contracts.governor().cast_vote(id, support);
        self.mutate(contracts.signer()?, id, MutationKind::Vote, call).await
    }

    /// Queue a succeeded proposal, replaying the calls recorded at creation.
    pub async fn queue(&self, proposal: &Proposal) -> GovResult<CommandOutcome> {
        let hash = description_hash(&proposal.description);
        let contracts = self.gateway.bind(self.session.identity());
        let call = contracts.governor().queue(&proposal.calls, hash);
        self.mutate(contracts.signer()?, proposal.id, MutationKind::Queue, call)
            .await
    }

    /// Execute a queued proposal, replaying the calls recorded at creation.
    pub async fn execute(&self, proposal: &Proposal) -> GovResult<CommandOutcome> {
        let hash = description_hash(&proposal.description);
        let contracts = self.gateway.bind(self.session.identity());
        let call = contracts.governor().execute(&proposal.calls, hash);
        self.mutate(contracts.signer()?, proposal.id, MutationKind::Execute, call)
            .await
    }

    /// Propose a single zero-value call to a known target.
    pub async fn create_proposal(&self, draft: &ProposalDraft) -> GovResult<CommandOutcome> {
        let calls = vec![self.encode_draft(draft)?];
        let id = hash_proposal(&calls, description_hash(&draft.description));
        let contracts = self.gateway.bind(self.session.identity());
        let call = contracts.governor().propose(&calls, &draft.description);
        self.mutate(contracts.signer()?, id, MutationKind::Create, call).await
    }

    /// Build the proposal call from operator input, without any network access.
    pub fn encode_draft(&self, draft: &ProposalDraft) -> GovResult<ProposalCall> {
        let args: serde_json::Value = serde_json::from_str(&draft.args_json)
            .map_err(|e| GovError::ValidationError(format!("arguments are not valid JSON: {}", e)))?;
        if !args.is_array() {
            return Err(GovError::ValidationError(
                "arguments must be a JSON array".to_string(),
            ));
        }

        let interface = self.interfaces.get(&draft.target).ok_or_else(|| {
            GovError::ValidationError(format!("no interface known for target {}", draft.target))
        })?;
        let calldata = interface
            .encode_json_call(&draft.function, &args)
            .map_err(|e| GovError::ValidationError(e.to_string()))?;

        Ok(ProposalCall {
            target: draft.target,
            value: U256::ZERO,
            calldata: Bytes::from(calldata),
        })
    }

    /// Claim the proposal, submit, release, then refetch.
    async fn mutate(
        &self,
        signer: Identity,
        id: ProposalId,
        kind: MutationKind,
        call: ContractCall,
    ) -> GovResult<CommandOutcome> {
        let guard = self.in_flight.try_begin(id, kind)?;
        let result = self.submitter.submit(&signer, call).await;
        drop(guard);

        let confirmation = result?;
        info!(proposal_id = %id, action = %kind, tx = %confirmation.transaction_hash, "proposal action confirmed");

        let certificates = match (&self.catalog, kind) {
            (Some(catalog), MutationKind::Execute) => Some(catalog.list_certificates().await),
            _ => None,
        };
        Ok(CommandOutcome {
            proposal_id: id,
            confirmation,
            refresh: self.indexer.list_proposals().await,
            certificates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{credential, ScanRange};
    use crate::governance::proposal::ProposalState;
    use crate::ledger::mock::MockLedger;
    use crate::session::Identity;
    use std::time::Duration;

    struct Fixture {
        ledger: Arc<MockLedger>,
        controller: ProposalLifecycleController<MockLedger>,
        operator: Address,
    }

    fn fixture() -> Fixture {
        let operator = Address::repeat_byte(0xa1);
        let ledger = Arc::new(MockLedger::new().with_accounts(vec![operator]));
        let book = ledger.address_book();
        let gateway = Arc::new(ContractGateway::new(ledger.clone(), book));
        let session = Arc::new(Session::new());
        session.set_identity(Identity(operator));
        let submitter = Arc::new(
            TransactionSubmitter::new(ledger.clone())
                .with_timing(Duration::from_secs(2), Duration::from_millis(5)),
        );
        let indexer = ProposalIndexer::new(gateway.clone(), ScanRange::default());
        let interface = Interface::from_signatures(credential::DEFAULT_FUNCTIONS).unwrap();
        let controller = ProposalLifecycleController::new(gateway, session, submitter, indexer)
            .with_interface(book.credential, interface);

        Fixture {
            ledger,
            controller,
            operator,
        }
    }

    fn draft(fixture: &Fixture, args_json: &str) -> ProposalDraft {
        ProposalDraft {
            target: fixture.ledger.address_book().credential,
            function: "issue".to_string(),
            args_json: args_json.to_string(),
            description: "Issue certificate to Alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_execute_refreshes_certificates() {
        let fixture = fixture();
        let call = fixture
            .controller
            .encode_draft(&draft(&fixture, r#"["Alice","Rust 101","A","2024-06-01"]"#))
            .unwrap();
        let Fixture {
            ledger,
            controller,
            operator,
        } = fixture;
        let gateway = Arc::new(ContractGateway::new(ledger.clone(), ledger.address_book()));
        let controller =
            controller.with_certificates(CertificateCatalog::new(gateway, ScanRange::default()));

        let id = ledger.seed_proposal(operator, vec![call], "issue", ProposalState::Queued);
        let proposal = controller.proposal(id).await.unwrap();
        let outcome = controller.execute(&proposal).await.unwrap();

        let certificates = outcome.certificates.unwrap().unwrap();
        assert_eq!(certificates.items.len(), 1);
        assert_eq!(certificates.items[0].name, "Alice");
    }

    #[tokio::test]
    async fn test_create_proposal_predicts_id() {
        let fixture = fixture();
        let outcome = fixture
            .controller
            .create_proposal(&draft(&fixture, r#"["Alice","Rust 101","A","2024-06-01"]"#))
            .await
            .unwrap();

        let listing = outcome.refresh.unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].id, outcome.proposal_id);
        assert_eq!(listing.items[0].state, ProposalState::Pending);
        assert!(fixture.controller.in_flight().is_idle());
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected_offline() {
        let fixture = fixture();
        let before = fixture.ledger.rpc_calls();

        let result = fixture
            .controller
            .create_proposal(&draft(&fixture, r#"["Alice", "Rust 101""#))
            .await;
        assert!(matches!(result, Err(GovError::ValidationError(_))));
        assert_eq!(fixture.ledger.rpc_calls(), before);
    }

    #[tokio::test]
    async fn test_wrong_arity_is_rejected_offline() {
        let fixture = fixture();
        let before = fixture.ledger.rpc_calls();

        let result = fixture
            .controller
            .create_proposal(&draft(&fixture, r#"["Alice"]"#))
            .await;
        assert!(matches!(result, Err(GovError::ValidationError(_))));
        assert_eq!(fixture.ledger.rpc_calls(), before);
    }

    #[tokio::test]
    async fn test_unknown_target_is_rejected() {
        let fixture = fixture();
        let mut draft = draft(&fixture, "[]");
        draft.target = Address::repeat_byte(0x99);

        assert!(matches!(
            fixture.controller.encode_draft(&draft),
            Err(GovError::ValidationError(reason)) if reason.contains("no interface")
        ));
    }

    #[tokio::test]
    async fn test_vote_on_active_proposal() {
        let fixture = fixture();
        let call = fixture
            .controller
            .encode_draft(&draft(&fixture, r#"["Alice","Rust 101","A","2024-06-01"]"#))
            .unwrap();
        let id = fixture
            .ledger
            .seed_proposal(fixture.operator, vec![call], "vote me", ProposalState::Active);

        let outcome = fixture.controller.cast_vote(id, VoteSupport::For).await.unwrap();
        assert_eq!(outcome.proposal_id, id);
        assert!(outcome.refresh.is_ok());

        // A second vote from the same identity is refused by the governor
        assert!(matches!(
            fixture.controller.cast_vote(id, VoteSupport::Against).await,
            Err(GovError::ContractRevert(reason)) if reason.contains("already cast")
        ));
    }

    #[tokio::test]
    async fn test_contract_decides_legality() {
        let fixture = fixture();
        let call = fixture
            .controller
            .encode_draft(&draft(&fixture, r#"["Alice","Rust 101","A","2024-06-01"]"#))
            .unwrap();
        let id = fixture
            .ledger
            .seed_proposal(fixture.operator, vec![call], "early", ProposalState::Active);
        let proposal = fixture.controller.proposal(id).await.unwrap();

        assert!(matches!(
            fixture.controller.queue(&proposal).await,
            Err(GovError::ContractRevert(reason)) if reason.contains("not successful")
        ));
        assert_eq!(fixture.ledger.proposal_state(id), Some(ProposalState::Active));
    }

    #[tokio::test]
    async fn test_mutation_requires_identity() {
        let fixture = fixture();
        fixture.controller.session.disconnect();

        assert_eq!(
            fixture
                .controller
                .cast_vote(ProposalId(U256::from(1u64)), VoteSupport::For)
                .await
                .err(),
            Some(GovError::NoWalletAvailable)
        );
    }

    #[tokio::test]
    async fn test_dispatch_routes_commands() {
        let fixture = fixture();
        let command = ProposalCommand::Create(draft(
            &fixture,
            r#"["Bob","Rust 201","B","2024-07-01"]"#,
        ));
        assert_eq!(command.proposal_id(), None);

        let outcome = fixture.controller.dispatch(command).await.unwrap();
        let proposal = fixture.controller.proposal(outcome.proposal_id).await.unwrap();
        assert_eq!(proposal.description, "Issue certificate to Alice");
    }
}
