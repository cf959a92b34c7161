//! tracker-core - Core library for the product test tracker
//!
//! Records, the observable record store, the remote collection abstraction
//! and its adapters, the local-first sync engine and due-date reminders.
//! Shared by every tracker front end.

pub mod cache;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod notify;
pub mod remote;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use identity::{CollectionPath, Identity, IdentityProvider, LocalIdentityProvider};
pub use models::{Priority, Record, RecordDraft, RecordId};
pub use store::RecordStore;
pub use sync::{SyncEngine, SyncState, SyncStatus};
