//! In-process remote collection

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identity::CollectionPath;
use crate::models::RemoteDocument;

use super::listeners::Listeners;
use super::{RemoteChannel, RemoteEvent, Subscription};

/// A write received by [`MemoryRemote`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Upsert {
        path: CollectionPath,
        document: RemoteDocument,
    },
    Delete {
        path: CollectionPath,
        id: String,
    },
}

#[derive(Default)]
struct State {
    collections: HashMap<CollectionPath, BTreeMap<String, Map<String, Value>>>,
    writes: Vec<WriteOp>,
    failing_writes: Option<String>,
}

/// Remote collection kept in memory, with live subscriptions.
///
/// Snapshots list documents ordered by id. Every successful write pushes a
/// fresh snapshot to the collection's listeners before the state lock is
/// released, so listeners see snapshots in write order. Writes can be made
/// to fail to exercise transport error handling.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<State>>,
    listeners: Listeners,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail with `reason`, or succeed again with
    /// `None`.
    pub fn fail_writes(&self, reason: Option<&str>) {
        self.lock().failing_writes = reason.map(str::to_string);
    }

    /// Store a document as another device would, notifying listeners.
    pub fn put_document(&self, path: &CollectionPath, document: RemoteDocument) {
        let mut state = self.lock();
        state
            .collections
            .entry(path.clone())
            .or_default()
            .insert(document.id, document.fields);
        self.publish(&state, path);
    }

    /// Remove a document as another device would, notifying listeners.
    pub fn remove_document(&self, path: &CollectionPath, id: &str) {
        let mut state = self.lock();
        let removed = state
            .collections
            .get_mut(path)
            .and_then(|documents| documents.remove(id));
        if removed.is_some() {
            self.publish(&state, path);
        }
    }

    /// Push an error event to the collection's listeners.
    pub fn emit_error(&self, path: &CollectionPath, message: &str) {
        self.listeners
            .broadcast(path, &RemoteEvent::Error(message.to_string()));
    }

    pub fn documents(&self, path: &CollectionPath) -> Vec<RemoteDocument> {
        Self::listing(&self.lock(), path)
    }

    /// Writes received through [`RemoteChannel`], oldest first.
    pub fn writes(&self) -> Vec<WriteOp> {
        self.lock().writes.clone()
    }

    pub fn listener_count(&self, path: &CollectionPath) -> usize {
        self.listeners.count(path)
    }

    /// End every subscription on `path`, as a dropped connection would.
    pub fn close_subscriptions(&self, path: &CollectionPath) -> usize {
        self.listeners.close(path)
    }

    /// Broadcast the listing while the caller still holds the state lock.
    fn publish(&self, state: &State, path: &CollectionPath) {
        let snapshot = RemoteEvent::Snapshot(Self::listing(state, path));
        self.listeners.broadcast(path, &snapshot);
    }

    fn listing(state: &State, path: &CollectionPath) -> Vec<RemoteDocument> {
        state
            .collections
            .get(path)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, fields)| RemoteDocument::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RemoteChannel for MemoryRemote {
    fn subscribe(&self, path: &CollectionPath) -> Result<Subscription> {
        let state = self.lock();
        let initial = RemoteEvent::Snapshot(Self::listing(&state, path));
        Ok(self.listeners.register(path, initial))
    }

    async fn upsert(&self, path: &CollectionPath, document: RemoteDocument) -> Result<()> {
        let mut state = self.lock();
        if let Some(reason) = &state.failing_writes {
            return Err(Error::Transport(reason.clone()));
        }
        state.writes.push(WriteOp::Upsert {
            path: path.clone(),
            document: document.clone(),
        });
        state
            .collections
            .entry(path.clone())
            .or_default()
            .insert(document.id, document.fields);
        self.publish(&state, path);
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<()> {
        let mut state = self.lock();
        if let Some(reason) = &state.failing_writes {
            return Err(Error::Transport(reason.clone()));
        }
        state.writes.push(WriteOp::Delete {
            path: path.clone(),
            id: id.to_string(),
        });
        if let Some(documents) = state.collections.get_mut(path) {
            documents.remove(id);
        }
        self.publish(&state, path);
        Ok(())
    }
}
