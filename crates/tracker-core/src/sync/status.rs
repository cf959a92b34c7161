//! Observable sync status

use std::fmt;

/// Lifecycle state of the sync engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No identity, nothing subscribed
    #[default]
    Disconnected,
    /// Subscription opened, first snapshot not applied yet
    Subscribing,
    /// Last snapshot applied
    Synced,
    /// Subscription or push failure; local state retained
    Error,
}

/// Status published to the UI.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SyncStatus {
    pub state: SyncState,
    /// Failure detail, present in the error state
    pub detail: Option<String>,
}

impl SyncStatus {
    pub const fn new(state: SyncState) -> Self {
        Self {
            state,
            detail: None,
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            state: SyncState::Error,
            detail: Some(detail.into()),
        }
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.state, SyncState::Error)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.state, &self.detail) {
            (SyncState::Disconnected, _) => f.write_str("offline"),
            (SyncState::Subscribing, _) => f.write_str("syncing"),
            (SyncState::Synced, _) => f.write_str("synced"),
            (SyncState::Error, Some(detail)) => write!(f, "sync error: {detail}"),
            (SyncState::Error, None) => f.write_str("sync error"),
        }
    }
}
