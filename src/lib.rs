//! certgov - operator client for credential governance
//!
//! Drives an on-chain governor that controls a credential registry through a
//! timelock: list and act on proposals, administer timelock roles, manage
//! voting tokens and browse issued certificates.
//!
//! Key principles:
//! - The ledger is the only source of truth; listings are recomputed after
//!   every confirmed mutation
//! - Contracts decide legality; the client only gates what it offers
//! - Signing stays with the node-managed account, no keys in this process

pub mod abi;
pub mod app;
pub mod certificates;
pub mod contracts;
pub mod error;
pub mod governance;
pub mod ledger;
pub mod listing;
pub mod roles;
pub mod session;
pub mod tokens;
pub mod tx;

pub use app::{App, AppSettings};
pub use error::{GovError, GovResult};
