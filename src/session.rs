//! Operator session: the connected identity and what is cached for it.
//!
//! The session is passed by reference to every component. Changing (or
//! dropping) the identity invalidates the cached role identifiers and the
//! cached admin flag together.

use crate::contracts::RoleId;
use crate::error::{GovError, GovResult};
use crate::ledger::LedgerClient;
use crate::roles::RoleKind;
use alloy_primitives::Address;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

/// The operator's ledger address for the lifetime of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(pub Address);

impl Identity {
    pub fn address(&self) -> Address {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
struct SessionState {
    identity: Option<Identity>,
    admin_role: Option<RoleId>,
    roles: HashMap<RoleKind, RoleId>,
    is_admin: Option<bool>,
}

/// Session-scoped state shared by all components.
#[derive(Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().identity
    }

    /// Switch identity; a different identity starts from empty caches.
    pub fn set_identity(&self, identity: Identity) {
        let mut state = self.lock();
        if state.identity == Some(identity) {
            return;
        }
        info!(identity = %identity, "session identity changed");
        *state = SessionState {
            identity: Some(identity),
            ..SessionState::default()
        };
    }

    pub fn disconnect(&self) {
        *self.lock() = SessionState::default();
    }

    pub fn cached_role(&self, kind: RoleKind) -> Option<RoleId> {
        self.lock().roles.get(&kind).copied()
    }

    pub fn cache_role(&self, kind: RoleKind, role: RoleId) {
        self.lock().roles.insert(kind, role);
    }

    pub fn cached_admin_role(&self) -> Option<RoleId> {
        self.lock().admin_role
    }

    pub fn cache_admin_role(&self, role: RoleId) {
        self.lock().admin_role = Some(role);
    }

    /// Cached admin flag for the current identity.
    pub fn cached_admin(&self) -> Option<bool> {
        self.lock().is_admin
    }

    /// Record the admin flag, unless the identity changed since it was checked.
    pub fn cache_admin(&self, checked: Identity, is_admin: bool) {
        let mut state = self.lock();
        if state.identity == Some(checked) {
            state.is_admin = Some(is_admin);
        }
    }
}

/// Acquires the signing identity from the ledger's signing backend.
pub struct WalletSession<L> {
    ledger: Arc<L>,
    session: Arc<Session>,
}

impl<L: LedgerClient> WalletSession<L> {
    pub fn new(ledger: Arc<L>, session: Arc<Session>) -> Self {
        Self { ledger, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Connect the first account the signing backend exposes.
    pub async fn connect(&self) -> GovResult<Identity> {
        let accounts = self.ledger.request_accounts().await?;
        let address = accounts
            .first()
            .copied()
            .ok_or(GovError::NoWalletAvailable)?;

        let identity = Identity(address);
        self.session.set_identity(identity);
        info!(identity = %identity, "wallet connected");
        Ok(identity)
    }
}
