//! Listener bookkeeping shared by the remote adapters

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::identity::CollectionPath;

use super::{RemoteEvent, Subscription};

struct Listener {
    id: u64,
    path: CollectionPath,
    sender: mpsc::UnboundedSender<RemoteEvent>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Set of live listeners keyed by collection path.
#[derive(Clone, Default)]
pub(crate) struct Listeners {
    registry: Arc<Mutex<Registry>>,
}

impl Listeners {
    /// Register a listener, queue `initial` as its first event and return the
    /// subscription handle.
    pub(crate) fn register(&self, path: &CollectionPath, initial: RemoteEvent) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        // Receiver is alive, so this cannot fail.
        let _ = sender.send(initial);

        let id = {
            let mut registry = self.lock();
            registry.next_id += 1;
            let id = registry.next_id;
            registry.listeners.push(Listener {
                id,
                path: path.clone(),
                sender,
            });
            id
        };
        tracing::debug!("Listener {id} registered on {path}");

        let registry = Arc::clone(&self.registry);
        Subscription::new(receiver, move || {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.listeners.retain(|listener| listener.id != id);
            tracing::debug!("Listener {id} removed");
        })
    }

    /// Deliver an event to every listener of `path`, dropping closed ones.
    pub(crate) fn broadcast(&self, path: &CollectionPath, event: &RemoteEvent) {
        let mut registry = self.lock();
        registry.listeners.retain(|listener| {
            if listener.path != *path {
                return !listener.sender.is_closed();
            }
            listener.sender.send(event.clone()).is_ok()
        });
    }

    /// Drop every listener of `path`; their subscriptions end.
    pub(crate) fn close(&self, path: &CollectionPath) -> usize {
        let mut registry = self.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|listener| listener.path != *path);
        let closed = before - registry.listeners.len();
        tracing::debug!("Closed {closed} listener(s) on {path}");
        closed
    }

    pub(crate) fn count(&self, path: &CollectionPath) -> usize {
        self.lock()
            .listeners
            .iter()
            .filter(|listener| listener.path == *path)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
