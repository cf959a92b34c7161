//! Identity glue
//!
//! The sync engine only needs the current identity, whether it is a guest,
//! and a way to follow changes. Real authentication lives outside the core.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub is_anonymous: bool,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Result<Self> {
        Self::build(uid.into(), false)
    }

    pub fn anonymous(uid: impl Into<String>) -> Result<Self> {
        Self::build(uid.into(), true)
    }

    fn build(uid: String, is_anonymous: bool) -> Result<Self> {
        let uid = uid.trim().to_string();
        if uid.is_empty() {
            return Err(Error::InvalidInput("Identity uid cannot be empty".to_string()));
        }
        if uid.contains('/') {
            return Err(Error::InvalidInput(
                "Identity uid cannot contain '/'".to_string(),
            ));
        }
        Ok(Self { uid, is_anonymous })
    }
}

/// Remote collection holding one identity's records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// `users/<uid>/tests`
    pub fn for_identity(identity: &Identity) -> Self {
        Self(format!("users/{}/tests", identity.uid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the current identity.
pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Option<Identity>;

    /// Follow identity changes. The receiver starts at the current value.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

/// Identity provider driven by explicit sign-in and sign-out calls.
#[derive(Debug, Clone)]
pub struct LocalIdentityProvider {
    state: watch::Sender<Option<Identity>>,
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LocalIdentityProvider {
    pub fn new(initial: Option<Identity>) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    /// Sign in as a fresh guest and return the new identity.
    pub fn sign_in_anonymously(&self) -> Identity {
        let identity = Identity {
            uid: Uuid::now_v7().simple().to_string(),
            is_anonymous: true,
        };
        self.state.send_replace(Some(identity.clone()));
        identity
    }

    pub fn sign_in(&self, identity: Identity) {
        self.state.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        self.state.send_replace(None);
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn current(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.state.subscribe()
    }
}
