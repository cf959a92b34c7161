//! Local-first synchronization
//!
//! State machine: `Disconnected -> Subscribing -> Synced <-> Error`, back to
//! `Disconnected` whenever the identity is cleared or changes.

mod actor;
mod engine;
mod status;


pub use actor::{spawn, EngineHandle, RecordEdit};
pub use engine::{PushKind, SyncEngine};
pub use status::{SyncState, SyncStatus};
