//! Governance token handle.

use super::{read, ContractCall};
use crate::abi::{self, ParamType, Token as AbiToken};
use crate::error::{GovError, GovResult};
use crate::ledger::LedgerClient;
use alloy_primitives::{Address, U256};

pub const MINT: &str = "mint(address,uint256)";
pub const DELEGATE: &str = "delegate(address)";
pub const BALANCE_OF: &str = "balanceOf(address)";

/// Voting token bound to a ledger connection.
pub struct GovToken<'a, L> {
    ledger: &'a L,
    address: Address,
}

impl<'a, L: LedgerClient> GovToken<'a, L> {
    pub fn new(ledger: &'a L, address: Address) -> Self {
        Self { ledger, address }
    }

    pub async fn balance_of(&self, account: Address) -> GovResult<U256> {
        let data = abi::encode_call(abi::selector(BALANCE_OF), &[AbiToken::Address(account)]);
        let output = read(self.ledger, self.address, data).await?;
        abi::decode(&[ParamType::Uint(256)], &output)
            .map_err(|e| GovError::malformed("balanceOf", e))?
            .pop()
            .and_then(AbiToken::into_uint)
            .ok_or_else(|| GovError::NetworkError("empty balanceOf response".to_string()))
    }

    pub fn mint(&self, to: Address, amount: U256) -> ContractCall {
        ContractCall::new(
            self.address,
            "mint",
            abi::encode_call(
                abi::selector(MINT),
                &[AbiToken::Address(to), AbiToken::Uint(amount)],
            ),
        )
    }

    pub fn delegate(&self, delegatee: Address) -> ContractCall {
        ContractCall::new(
            self.address,
            "delegate",
            abi::encode_call(abi::selector(DELEGATE), &[AbiToken::Address(delegatee)]),
        )
    }
}
