//! Remote document collection abstraction
//!
//! A [`RemoteChannel`] exposes per-identity collections of documents with a
//! live, push-based subscription and individual document writes. Transports
//! deliver subscription events from their own tasks; consumers read them
//! through a [`Subscription`], which unregisters its listener when dropped.

mod listeners;
mod memory;
mod sqlite;

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::identity::CollectionPath;
use crate::models::RemoteDocument;

pub use memory::{MemoryRemote, WriteOp};
pub use sqlite::SqliteRemote;

/// Event delivered by a live subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// Complete listing of the collection at a point in time.
    Snapshot(Vec<RemoteDocument>),
    /// The subscription failed. The listener stays registered.
    Error(String),
}

/// Handle on a live subscription.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<RemoteEvent>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap an event receiver. `on_cancel` runs once when the subscription is
    /// cancelled or dropped.
    pub fn new(
        events: mpsc::UnboundedReceiver<RemoteEvent>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Wait for the next event. `None` once the transport closed the stream.
    pub async fn recv(&mut self) -> Option<RemoteEvent> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<RemoteEvent> {
        self.events.try_recv().ok()
    }

    /// Unregister the listener.
    pub fn cancel(mut self) {
        self.unregister();
    }

    fn unregister(&mut self) {
        if let Some(on_cancel) = self.on_cancel.take() {
            self.events.close();
            on_cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.on_cancel.is_some())
            .finish()
    }
}

/// Remote collection scoped by identity.
///
/// Implementations are cheap handles (clone shares the connection) so that
/// writes can be issued from spawned tasks.
pub trait RemoteChannel: Clone + Send + Sync + 'static {
    /// Open a live subscription on a collection. The current listing is
    /// delivered as the first snapshot.
    fn subscribe(&self, path: &CollectionPath) -> Result<Subscription>;

    /// Create or fully overwrite the document with the same id.
    fn upsert(
        &self,
        path: &CollectionPath,
        document: RemoteDocument,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete a document. Deleting a missing document succeeds.
    fn delete(&self, path: &CollectionPath, id: &str) -> impl Future<Output = Result<()>> + Send;
}
