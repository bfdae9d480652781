//! Typed handles to the four remote contracts.
//!
//! `ContractGateway` owns the ledger connection and the address book.
//! `bind` produces handles for one identity (or none, for read-only use).
//! Mutating methods on the handles only build a `ContractCall`; callers take
//! the signer from the same binding and hand both to `TransactionSubmitter`.

pub mod addresses;
pub mod credential;
pub mod events;
pub mod governor;
pub mod timelock;
pub mod token;

pub use addresses::AddressBook;
pub use credential::Credential;
pub use events::ScanRange;
pub use governor::Governor;
pub use timelock::{RoleId, Timelock};
pub use token::GovToken;

use crate::error::{GovError, GovResult};
use crate::ledger::{CallRequest, LedgerClient};
use crate::session::Identity;
use alloy_primitives::{Address, Bytes, U256};
use std::sync::Arc;

/// A state-changing contract call, ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    /// Contract method name, for logs.
    pub method: &'static str,
}

impl ContractCall {
    pub fn new(to: Address, method: &'static str, data: Vec<u8>) -> Self {
        Self {
            to,
            data: Bytes::from(data),
            value: U256::ZERO,
            method,
        }
    }
}

/// Read-only call against the latest block.
pub(crate) async fn read<L: LedgerClient>(ledger: &L, to: Address, data: Vec<u8>) -> GovResult<Bytes> {
    let request = CallRequest {
        from: None,
        to,
        data: Bytes::from(data),
        value: U256::ZERO,
    };
    Ok(ledger.call(&request).await?)
}

/// Ledger connection plus the deployment's contract addresses.
pub struct ContractGateway<L> {
    ledger: Arc<L>,
    book: AddressBook,
}

impl<L: LedgerClient> ContractGateway<L> {
    pub fn new(ledger: Arc<L>, book: AddressBook) -> Self {
        Self { ledger, book }
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.book
    }

    /// Handles bound to `identity`, or read-only handles for `None`.
    pub fn bind(&self, identity: Option<Identity>) -> Contracts<'_, L> {
        Contracts {
            ledger: self.ledger.as_ref(),
            book: &self.book,
            identity,
        }
    }
}

/// Contract handles bound to one (optional) signing identity.
pub struct Contracts<'a, L> {
    ledger: &'a L,
    book: &'a AddressBook,
    identity: Option<Identity>,
}

impl<'a, L: LedgerClient> Contracts<'a, L> {
    /// The signing identity, if these handles can submit transactions.
    pub fn signer(&self) -> GovResult<Identity> {
        self.identity.ok_or(GovError::NoWalletAvailable)
    }

    pub fn governor(&self) -> Governor<'a, L> {
        Governor::new(self.ledger, self.book.governor)
    }

    pub fn timelock(&self) -> Timelock<'a, L> {
        Timelock::new(self.ledger, self.book.timelock)
    }

    pub fn token(&self) -> GovToken<'a, L> {
        GovToken::new(self.ledger, self.book.token)
    }

    pub fn credential(&self) -> Credential<'a, L> {
        Credential::new(self.ledger, self.book.credential)
    }
}
