//! Timelock role administration.
//!
//! Role identifiers are read from the timelock once per session and cached;
//! the admin check is cached for the session identity. Grants are refused
//! locally for non-admins, and the timelock reverts them anyway.

use crate::contracts::{ContractGateway, RoleId};
use crate::error::{GovError, GovResult};
use crate::ledger::LedgerClient;
use crate::session::{Identity, Session};
use crate::tx::{Confirmation, TransactionSubmitter};
use alloy_primitives::Address;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Grantable timelock roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleKind {
    Proposer,
    Executor,
}

impl RoleKind {
    pub const ALL: [RoleKind; 2] = [RoleKind::Proposer, RoleKind::Executor];
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleKind::Proposer => f.write_str("proposer"),
            RoleKind::Executor => f.write_str("executor"),
        }
    }
}

impl FromStr for RoleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proposer" => Ok(RoleKind::Proposer),
            "executor" => Ok(RoleKind::Executor),
            other => Err(format!("unknown role {:?}: expected proposer or executor", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGrantRequest {
    pub role: RoleKind,
    pub grantee: Address,
}

pub struct RoleAdministrator<L> {
    gateway: Arc<ContractGateway<L>>,
    session: Arc<Session>,
    submitter: Arc<TransactionSubmitter<L>>,
}

impl<L: LedgerClient> RoleAdministrator<L> {
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

    async fn admin_role(&self) -> GovResult<RoleId> {
        if let Some(role) = self.session.cached_admin_role() {
            return Ok(role);
        }
        let role = self.gateway.bind(None).timelock().admin_role().await?;
        self.session.cache_admin_role(role);
        Ok(role)
    }

    /// Role identifier for `kind`, read once per session.
    pub async fn role_id(&self, kind: RoleKind) -> GovResult<RoleId> {
        if let Some(role) = self.session.cached_role(kind) {
            return Ok(role);
        }
        let role = self.gateway.bind(None).timelock().role_id(kind).await?;
        self.session.cache_role(kind, role);
        Ok(role)
    }

    /// Whether `address` holds the timelock admin role.
    ///
    /// The answer for the session identity is cached until it changes.
    pub async fn is_admin(&self, address: Address) -> GovResult<bool> {
        let session_identity = self.session.identity();
        let is_session = session_identity.map(|identity| identity.address()) == Some(address);
        if is_session {
            if let Some(cached) = self.session.cached_admin() {
                return Ok(cached);
            }
        }

        let role = self.admin_role().await?;
        let is_admin = self.gateway.bind(None).timelock().has_role(role, address).await?;
        if let (true, Some(identity)) = (is_session, session_identity) {
            self.session.cache_admin(identity, is_admin);
        }
        Ok(is_admin)
    }

    /// Grant requests this identity may issue: all roles for admins, none otherwise.
    pub async fn offered_grants(&self, identity: Identity) -> GovResult<&'static [RoleKind]> {
        if self.is_admin(identity.address()).await? {
            Ok(&RoleKind::ALL)
        } else {
            Ok(&[])
        }
    }

    pub async fn grant_role(&self, request: RoleGrantRequest) -> GovResult<Confirmation> {
        let contracts = self.gateway.bind(self.session.identity());
        let signer = contracts.signer()?;
        if !self.is_admin(signer.address()).await? {
            return Err(GovError::NotAdmin(signer.address()));
        }

        let role = self.role_id(request.role).await?;
        let call = contracts.timelock().grant_role(role, request.grantee);
        let confirmation = self.submitter.submit(&signer, call).await?;
        info!(role = %request.role, grantee = %request.grantee, "role granted");
        Ok(confirmation)
    }
}
