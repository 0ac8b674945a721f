//! Owned session state with explicit transitions.
//!
//! Consumers never hold a live reference: they read a cloned [`AuthSnapshot`]
//! or subscribe to a `watch` channel that yields snapshots.

use crate::store::Account;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPhase {
    Unauthenticated,
    Loading,
    Authenticated,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub phase: AuthPhase,
    pub user: Option<Account>,
}

impl AuthSnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            phase: AuthPhase::Unauthenticated,
            user: None,
        }
    }
}

#[derive(Debug)]
pub struct SessionState {
    tx: watch::Sender<AuthSnapshot>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthSnapshot::default());
        Self { tx }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.tx.subscribe()
    }

    /// A login or profile fetch is in flight. Any previous user is kept until
    /// the outcome is known.
    pub fn begin_loading(&self) {
        self.tx.send_modify(|snapshot| snapshot.phase = AuthPhase::Loading);
    }

    pub fn authenticated(&self, user: Account) {
        self.tx.send_replace(AuthSnapshot {
            phase: AuthPhase::Authenticated,
            user: Some(user),
        });
    }

    /// Drop the user; no profile is ever kept without the authenticated phase.
    pub fn signed_out(&self) {
        self.tx.send_replace(AuthSnapshot::default());
    }

    pub fn failed(&self, message: impl Into<String>) {
        self.tx.send_replace(AuthSnapshot {
            phase: AuthPhase::Failed(message.into()),
            user: None,
        });
    }
}
