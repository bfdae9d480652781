//! Timelock contract handle (AccessControl surface).

use super::{read, ContractCall};
use crate::abi::{self, ParamType, Token};
use crate::error::{GovError, GovResult};
use crate::ledger::LedgerClient;
use crate::roles::RoleKind;
use alloy_primitives::{Address, B256};
use std::fmt;

pub const PROPOSER_ROLE: &str = "PROPOSER_ROLE()";
pub const EXECUTOR_ROLE: &str = "EXECUTOR_ROLE()";
pub const DEFAULT_ADMIN_ROLE: &str = "DEFAULT_ADMIN_ROLE()";
pub const HAS_ROLE: &str = "hasRole(bytes32,address)";
pub const GRANT_ROLE: &str = "grantRole(bytes32,address)";

/// Opaque 32-byte role identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleId(pub B256);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timelock bound to a ledger connection.
pub struct Timelock<'a, L> {
    ledger: &'a L,
    address: Address,
}

impl<'a, L: LedgerClient> Timelock<'a, L> {
    pub fn new(ledger: &'a L, address: Address) -> Self {
        Self { ledger, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Identifier of a grantable role, as the contract reports it.
    pub async fn role_id(&self, kind: RoleKind) -> GovResult<RoleId> {
        let signature = match kind {
            RoleKind::Proposer => PROPOSER_ROLE,
            RoleKind::Executor => EXECUTOR_ROLE,
        };
        self.read_role(signature).await
    }

    pub async fn admin_role(&self) -> GovResult<RoleId> {
        self.read_role(DEFAULT_ADMIN_ROLE).await
    }

    async fn read_role(&self, signature: &str) -> GovResult<RoleId> {
        let output = read(self.ledger, self.address, abi::selector(signature).to_vec()).await?;
        abi::decode(&[ParamType::FixedBytes(32)], &output)
            .map_err(|e| GovError::malformed(signature, e))?
            .pop()
            .and_then(Token::into_fixed_bytes)
            .map(|bytes| RoleId(B256::from_slice(&bytes)))
            .ok_or_else(|| GovError::NetworkError(format!("empty {} response", signature)))
    }

    pub async fn has_role(&self, role: RoleId, account: Address) -> GovResult<bool> {
        let data = abi::encode_call(
            abi::selector(HAS_ROLE),
            &[Token::FixedBytes(role.0.to_vec()), Token::Address(account)],
        );
        let output = read(self.ledger, self.address, data).await?;
        abi::decode(&[ParamType::Bool], &output)
            .map_err(|e| GovError::malformed("hasRole", e))?
            .pop()
            .and_then(Token::into_bool)
            .ok_or_else(|| GovError::NetworkError("empty hasRole response".to_string()))
    }

    pub fn grant_role(&self, role: RoleId, account: Address) -> ContractCall {
        ContractCall::new(
            self.address,
            "grantRole",
            abi::encode_call(
                abi::selector(GRANT_ROLE),
                &[Token::FixedBytes(role.0.to_vec()), Token::Address(account)],
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mock::MockLedger;
    use alloy_primitives::keccak256;

    #[tokio::test]
    async fn test_role_ids() {
        let ledger = MockLedger::new();
        let timelock = Timelock::new(&ledger, ledger.address_book().timelock);

        assert_eq!(
            timelock.role_id(RoleKind::Proposer).await.unwrap(),
            RoleId(keccak256("PROPOSER_ROLE"))
        );
        assert_eq!(
            timelock.role_id(RoleKind::Executor).await.unwrap(),
            RoleId(keccak256("EXECUTOR_ROLE"))
        );
        assert_eq!(timelock.admin_role().await.unwrap(), RoleId(B256::ZERO));
    }

    #[tokio::test]
    async fn test_has_role() {
        let admin = Address::repeat_byte(0xa1);
        let ledger = MockLedger::new().with_admin(admin);
        let timelock = Timelock::new(&ledger, ledger.address_book().timelock);
        let role = timelock.admin_role().await.unwrap();

        assert!(timelock.has_role(role, admin).await.unwrap());
        assert!(!timelock
            .has_role(role, Address::repeat_byte(0xb2))
            .await
            .unwrap());
    }

    #[test]
    fn test_grant_role_call() {
        let ledger = MockLedger::new();
        let timelock = Timelock::new(&ledger, ledger.address_book().timelock);
        let call = timelock.grant_role(RoleId(B256::repeat_byte(0x01)), Address::repeat_byte(0x02));

        assert_eq!(call.to, ledger.address_book().timelock);
        assert_eq!(&call.data[..4], &abi::selector(GRANT_ROLE));
        assert_eq!(call.data.len(), 4 + 64);
    }
}
