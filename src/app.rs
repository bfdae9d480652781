//! Component wiring for one operator session.

use crate::abi::Interface;
use crate::certificates::CertificateCatalog;
use crate::contracts::{credential, token, AddressBook, ContractGateway, ScanRange};
use crate::governance::{ProposalIndexer, ProposalLifecycleController};
use crate::ledger::LedgerClient;
use crate::roles::RoleAdministrator;
use crate::session::{Session, WalletSession};
use crate::tokens::TokenDesk;
use crate::tx::{TransactionSubmitter, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_POLL_INTERVAL};
use std::sync::Arc;
use std::time::Duration;

/// Runtime settings derived from the operator config.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub scan: ScanRange,
    /// Callable surface of the credential contract for new proposals.
    pub credential_interface: Interface,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            receipt_poll_interval: DEFAULT_POLL_INTERVAL,
            scan: ScanRange::default(),
            credential_interface: Interface::from_signatures(credential::DEFAULT_FUNCTIONS)
                .unwrap_or_default(),
        }
    }
}

/// Every component, sharing one ledger connection and one session.
pub struct App<L> {
    pub session: Arc<Session>,
    pub gateway: Arc<ContractGateway<L>>,
    pub wallet: WalletSession<L>,
    pub proposals: ProposalLifecycleController<L>,
    pub roles: RoleAdministrator<L>,
    pub certificates: CertificateCatalog<L>,
    pub tokens: TokenDesk<L>,
}

impl<L: LedgerClient> App<L> {
    pub fn new(ledger: Arc<L>, book: AddressBook, settings: AppSettings) -> Self {
        let session = Arc::new(Session::new());
        let gateway = Arc::new(ContractGateway::new(ledger.clone(), book));
        let submitter = Arc::new(
            TransactionSubmitter::new(ledger.clone())
                .with_timing(settings.confirmation_timeout, settings.receipt_poll_interval),
        );

        let token_interface =
            Interface::from_signatures([token::MINT, token::DELEGATE]).unwrap_or_default();
        let indexer = ProposalIndexer::new(gateway.clone(), settings.scan);
        let proposals = ProposalLifecycleController::new(
            gateway.clone(),
            session.clone(),
            submitter.clone(),
            indexer,
        )
        .with_interface(book.credential, settings.credential_interface)
        .with_interface(book.token, token_interface)
        .with_certificates(CertificateCatalog::new(gateway.clone(), settings.scan));

        Self {
            wallet: WalletSession::new(ledger, session.clone()),
            roles: RoleAdministrator::new(gateway.clone(), session.clone(), submitter.clone()),
            certificates: CertificateCatalog::new(gateway.clone(), settings.scan),
            tokens: TokenDesk::new(gateway.clone(), session.clone(), submitter),
            proposals,
            gateway,
            session,
        }
    }

    pub fn address_book(&self) -> &AddressBook {
        self.gateway.address_book()
    }
}
