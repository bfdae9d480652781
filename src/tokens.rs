//! Voting token operations.

use crate::contracts::ContractGateway;
use crate::error::GovResult;
use crate::ledger::LedgerClient;
use crate::session::Session;
use crate::tx::{Confirmation, TransactionSubmitter};
use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tracing::info;

pub struct TokenDesk<L> {
    gateway: Arc<ContractGateway<L>>,
    session: Arc<Session>,
    submitter: Arc<TransactionSubmitter<L>>,
}

impl<L: LedgerClient> TokenDesk<L> {
    pub fn new(
        gateway: Arc<ContractGateway<L>>,
        session: Arc<Session>,
        submitter: Arc<TransactionSubmitter<L>>,
    ) -> Self {
        Self {
            gateway,
            session,
            submitter,
        }
    }

    pub async fn balance_of(&self, account: Address) -> GovResult<U256> {
        self.gateway.bind(None).token().balance_of(account).await
    }

    /// Mint voting tokens; whether the caller may mint is up to the token.
    pub async fn mint(&self, to: Address, amount: U256) -> GovResult<Confirmation> {
        let contracts = self.gateway.bind(self.session.identity());
        let signer = contracts.signer()?;
        let call = contracts.token().mint(to, amount);
        let confirmation = self.submitter.submit(&signer, call).await?;
        info!(%to, %amount, "tokens minted");
        Ok(confirmation)
    }

    /// Delegate voting power, to the operator's own address by default.
    pub async fn delegate(&self, delegatee: Option<Address>) -> GovResult<Confirmation> {
        let contracts = self.gateway.bind(self.session.identity());
        let signer = contracts.signer()?;
        let delegatee = delegatee.unwrap_or_else(|| signer.address());
        let call = contracts.token().delegate(delegatee);
        let confirmation = self.submitter.submit(&signer, call).await?;
        info!(%delegatee, "voting power delegated");
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GovError;
    use crate::ledger::mock::MockLedger;
    use crate::session::Identity;
    use std::time::Duration;

    fn desk(ledger: &Arc<MockLedger>, session: Arc<Session>) -> TokenDesk<MockLedger> {
        let gateway = Arc::new(ContractGateway::new(ledger.clone(), ledger.address_book()));
        let submitter = Arc::new(
            TransactionSubmitter::new(ledger.clone())
                .with_timing(Duration::from_secs(2), Duration::from_millis(5)),
        );
        TokenDesk::new(gateway, session, submitter)
    }

    #[tokio::test]
    async fn test_mint_then_balance() {
        let operator = Address::repeat_byte(0xa1);
        let ledger = Arc::new(MockLedger::new().with_accounts(vec![operator]));
        let session = Arc::new(Session::new());
        session.set_identity(Identity(operator));
        let desk = desk(&ledger, session);

        desk.mint(operator, U256::from(1_000u64)).await.unwrap();
        assert_eq!(desk.balance_of(operator).await.unwrap(), U256::from(1_000u64));
    }

    #[tokio::test]
    async fn test_delegate_defaults_to_self() {
        let operator = Address::repeat_byte(0xa1);
        let ledger = Arc::new(MockLedger::new().with_accounts(vec![operator]));
        let session = Arc::new(Session::new());
        session.set_identity(Identity(operator));

        desk(&ledger, session).delegate(None).await.unwrap();
        assert_eq!(ledger.delegate_of(operator), Some(operator));
    }

    #[tokio::test]
    async fn test_mutations_need_identity() {
        let ledger = Arc::new(MockLedger::new());
        let desk = desk(&ledger, Arc::new(Session::new()));

        assert_eq!(desk.delegate(None).await.err(), Some(GovError::NoWalletAvailable));
        assert_eq!(desk.balance_of(Address::ZERO).await.unwrap(), U256::ZERO);
    }
}
