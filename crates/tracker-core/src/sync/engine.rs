//! Sync engine
//!
//! Keeps the record store consistent with the remote collection of the
//! current identity. All state lives on one owner: remote events and push
//! results reach the engine as messages and are applied by
//! [`SyncEngine::process_next`] / [`SyncEngine::process_pending`], never from
//! the transport's own tasks.
//!
//! Snapshots replace the store wholesale. A local write that a snapshot does
//! not contain yet disappears from the store until a later snapshot carries
//! it; the engine does not try to tell its own round-tripped writes apart
//! from other devices' writes.

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::cache::BootstrapCache;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::identity::{CollectionPath, Identity};
use crate::models::{
    decode_document, encode_record, starter_drafts, Record, RecordDraft, RecordId,
    RemoteDocument,
};
use crate::notify::{NotificationCenter, NotificationScheduler};
use crate::remote::{RemoteChannel, RemoteEvent, Subscription};
use crate::store::{RecordStore, RecordsView};
use crate::util::compact_text;

use super::status::{SyncState, SyncStatus};

/// Kind of remote write issued by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushKind {
    Upsert,
    Delete,
}

/// Result of a push, sent back to the owner.
#[derive(Debug)]
struct PushOutcome {
    session: u64,
    id: RecordId,
    kind: PushKind,
    result: std::result::Result<(), String>,
}

struct Session {
    serial: u64,
    identity: Identity,
    path: CollectionPath,
    subscription: Option<Subscription>,
}

enum Inbound {
    Remote(Option<RemoteEvent>),
    Push(PushOutcome),
}

/// Local-first sync engine for one identity at a time.
pub struct SyncEngine<R, N> {
    remote: R,
    store: RecordStore,
    scheduler: NotificationScheduler<N>,
    cache: Option<BootstrapCache>,
    seed_defaults: bool,
    session: Option<Session>,
    next_session: u64,
    /// Whether the store held data at any point in the current session
    populated: bool,
    status: watch::Sender<SyncStatus>,
    outcomes_tx: mpsc::UnboundedSender<PushOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<PushOutcome>,
    pushes: JoinSet<()>,
}

impl<R: RemoteChannel, N: NotificationCenter> SyncEngine<R, N> {
    pub fn new(
        remote: R,
        mut scheduler: NotificationScheduler<N>,
        config: &EngineConfig,
    ) -> Result<Self> {
        scheduler.set_reminder_time(config.reminder_hour, config.reminder_minute)?;
        let (status, _) = watch::channel(SyncStatus::default());
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        Ok(Self {
            remote,
            store: RecordStore::new(),
            scheduler,
            cache: config.cache_dir.clone().map(BootstrapCache::new),
            seed_defaults: config.seed_defaults,
            session: None,
            next_session: 0,
            populated: false,
            status,
            outcomes_tx,
            outcomes_rx,
            pushes: JoinSet::new(),
        })
    }

    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn subscribe_records(&self) -> watch::Receiver<RecordsView> {
        self.store.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub const fn scheduler(&self) -> &NotificationScheduler<N> {
        &self.scheduler
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(|session| &session.identity)
    }

    /// Switch to `identity`.
    ///
    /// The previous session, if any, is torn down first: subscription
    /// dropped, reminders cancelled, store cleared. Setting the identity that
    /// is already active does nothing.
    pub fn set_identity(&mut self, identity: Option<Identity>) {
        if self.identity() == identity.as_ref() {
            return;
        }
        self.end_session(true);
        if let Some(identity) = identity {
            self.begin_session(identity);
        }
    }

    /// Re-open the subscription of the current session, e.g. after the
    /// transport closed it.
    pub fn resubscribe(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(Error::NoIdentity)?;
        session.subscription = None;
        match self.remote.subscribe(&session.path) {
            Ok(subscription) => {
                session.subscription = Some(subscription);
                if !self.status.borrow().is_error() {
                    self.set_status(SyncStatus::new(SyncState::Subscribing));
                }
                Ok(())
            }
            Err(error) => {
                self.set_status(SyncStatus::error(compact_text(&error.to_string())));
                Err(error)
            }
        }
    }

    /// Create a record. The store holds it when this returns; the remote
    /// write happens in the background.
    pub fn add(&mut self, draft: RecordDraft) -> Result<RecordId> {
        self.require_session()?;
        Ok(self.insert_draft(draft))
    }

    /// Apply `mutator` to a record and push the full result.
    ///
    /// The id and creation time cannot be changed by the mutator. When the
    /// due date changes, the reminder is rescheduled.
    pub fn update(
        &mut self,
        id: &RecordId,
        mutator: impl FnOnce(&mut Record),
    ) -> Result<Record> {
        self.require_session()?;
        let current = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let mut updated = current.clone();
        mutator(&mut updated);
        updated.id = current.id;
        updated.created_at = current.created_at;

        self.store.upsert(updated.clone());
        if updated.due_date != current.due_date {
            self.schedule_reminder(&updated);
        }
        self.push_upsert(&updated);
        Ok(updated)
    }

    pub fn toggle_completed(&mut self, id: &RecordId) -> Result<Record> {
        self.update(id, |record| record.completed = !record.completed)
    }

    /// Remove a record locally and remotely and cancel its reminder.
    pub fn delete(&mut self, id: &RecordId) -> Result<()> {
        self.require_session()?;
        if !self.store.remove(id) {
            tracing::debug!("Delete of {id} which is not in the local store");
        }
        self.scheduler.cancel(id);
        self.push_delete(id);
        Ok(())
    }

    /// Wait for the next remote event or push result and apply it.
    ///
    /// Cancel safe: nothing is applied unless a message was received.
    pub async fn process_next(&mut self) {
        let subscription = self
            .session
            .as_mut()
            .and_then(|session| session.subscription.as_mut());

        let inbound = match subscription {
            Some(subscription) => tokio::select! {
                event = subscription.recv() => Inbound::Remote(event),
                Some(outcome) = self.outcomes_rx.recv() => Inbound::Push(outcome),
            },
            None => match self.outcomes_rx.recv().await {
                Some(outcome) => Inbound::Push(outcome),
                None => return,
            },
        };
        self.apply_inbound(inbound);
    }

    /// Apply every message already waiting, without blocking. Returns how
    /// many were applied.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        loop {
            self.reap_pushes();
            let event = self
                .session
                .as_mut()
                .and_then(|session| session.subscription.as_mut())
                .and_then(Subscription::try_recv);
            if let Some(event) = event {
                self.handle_remote_event(event);
                applied += 1;
                continue;
            }
            match self.outcomes_rx.try_recv() {
                Ok(outcome) => {
                    self.handle_push_outcome(outcome);
                    applied += 1;
                }
                Err(_) => return applied,
            }
        }
    }

    /// Wait until every push issued so far has finished.
    pub async fn flush_pushes(&mut self) {
        while let Some(joined) = self.pushes.join_next().await {
            if let Err(error) = joined {
                tracing::warn!("Push task ended abnormally: {error}");
            }
        }
    }

    /// Tear the engine down: unsubscribe, cancel reminders, abandon pushes
    /// still in flight. The store keeps its contents.
    pub fn shutdown(&mut self) {
        self.pushes.abort_all();
        self.end_session(false);
    }

    /// Apply one event of the live subscription.
    pub fn handle_remote_event(&mut self, event: RemoteEvent) {
        if self.session.is_none() {
            tracing::debug!("Dropping remote event received without a session");
            return;
        }
        match event {
            RemoteEvent::Snapshot(documents) => self.apply_snapshot(&documents),
            RemoteEvent::Error(message) => {
                tracing::warn!("Subscription error: {message}");
                self.set_status(SyncStatus::error(compact_text(&message)));
            }
        }
    }

    fn apply_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Remote(Some(event)) => self.handle_remote_event(event),
            Inbound::Remote(None) => {
                tracing::warn!("Subscription closed by the transport");
                if let Some(session) = self.session.as_mut() {
                    session.subscription = None;
                }
                self.set_status(SyncStatus::error("subscription closed"));
            }
            Inbound::Push(outcome) => self.handle_push_outcome(outcome),
        }
        self.reap_pushes();
    }

    fn apply_snapshot(&mut self, documents: &[RemoteDocument]) {
        let records: Vec<Record> = documents
            .iter()
            .filter_map(|document| match decode_document(document) {
                Ok(record) => Some(record),
                Err(error) => {
                    tracing::debug!("Dropping remote document {}: {error}", document.id);
                    None
                }
            })
            .collect();

        let anonymous = self
            .session
            .as_ref()
            .is_some_and(|session| session.identity.is_anonymous);

        if records.is_empty() && anonymous && !self.populated && self.seed_defaults {
            self.seed();
        } else {
            tracing::debug!(
                "Applying snapshot: {} records ({} dropped)",
                records.len(),
                documents.len() - records.len()
            );
            self.store.replace_all(records);
            if !self.store.is_empty() {
                self.populated = true;
            }
        }

        self.set_status(SyncStatus::new(SyncState::Synced));
        self.write_cache();
    }

    fn seed(&mut self) {
        let drafts = starter_drafts();
        tracing::info!("Seeding {} starter records", drafts.len());
        for draft in drafts {
            self.insert_draft(draft);
        }
    }

    fn insert_draft(&mut self, draft: RecordDraft) -> RecordId {
        let record = draft.into_record(RecordId::new(), Utc::now());
        let id = record.id.clone();

        self.store.upsert(record.clone());
        self.populated = true;
        if record.due_date.is_some() {
            self.schedule_reminder(&record);
        }
        self.push_upsert(&record);
        id
    }

    fn schedule_reminder(&mut self, record: &Record) {
        if let Err(error) = self.scheduler.schedule(record) {
            tracing::warn!("Failed to schedule reminder for {}: {error}", record.id);
        }
    }

    fn push_upsert(&mut self, record: &Record) {
        let document = encode_record(record);
        let id = record.id.clone();
        self.spawn_push(id, PushKind::Upsert, move |remote, path| async move {
            remote.upsert(&path, document).await
        });
    }

    fn push_delete(&mut self, id: &RecordId) {
        let key = id.to_string();
        self.spawn_push(id.clone(), PushKind::Delete, move |remote, path| async move {
            remote.delete(&path, &key).await
        });
    }

    fn spawn_push<F, Fut>(&mut self, id: RecordId, kind: PushKind, write: F)
    where
        F: FnOnce(R, CollectionPath) -> Fut,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let serial = session.serial;
        let pending = write(self.remote.clone(), session.path.clone());
        let outcomes = self.outcomes_tx.clone();

        self.pushes.spawn(async move {
            let result = pending.await.map_err(|error| error.to_string());
            // The engine may be gone; nothing left to report to.
            let _ = outcomes.send(PushOutcome {
                session: serial,
                id,
                kind,
                result,
            });
        });
    }

    fn handle_push_outcome(&mut self, outcome: PushOutcome) {
        let current = self.session.as_ref().map(|session| session.serial);
        if current != Some(outcome.session) {
            tracing::debug!("Ignoring push result of a previous session for {}", outcome.id);
            return;
        }
        match outcome.result {
            Ok(()) => tracing::debug!("{:?} of {} acknowledged", outcome.kind, outcome.id),
            Err(reason) => {
                tracing::warn!("{:?} of {} failed: {reason}", outcome.kind, outcome.id);
                self.set_status(SyncStatus::error(compact_text(&reason)));
            }
        }
    }

    fn reap_pushes(&mut self) {
        while let Some(joined) = self.pushes.try_join_next() {
            if let Err(error) = joined {
                tracing::warn!("Push task ended abnormally: {error}");
            }
        }
    }

    fn begin_session(&mut self, identity: Identity) {
        self.next_session += 1;
        let path = CollectionPath::for_identity(&identity);
        tracing::info!("Subscribing to {path}");
        self.set_status(SyncStatus::new(SyncState::Subscribing));

        if let Some(cache) = &self.cache {
            match cache.load(&identity) {
                Ok(records) if !records.is_empty() => {
                    tracing::debug!("Loaded {} records from bootstrap cache", records.len());
                    self.store.replace_all(records);
                    self.populated = true;
                }
                Ok(_) => {}
                Err(error) => tracing::warn!("Ignoring unreadable bootstrap cache: {error}"),
            }
        }

        let subscription = match self.remote.subscribe(&path) {
            Ok(subscription) => Some(subscription),
            Err(error) => {
                tracing::warn!("Failed to subscribe to {path}: {error}");
                self.set_status(SyncStatus::error(compact_text(&error.to_string())));
                None
            }
        };

        self.session = Some(Session {
            serial: self.next_session,
            identity,
            path,
            subscription,
        });
    }

    /// Drop the current session. `sign_out` also clears the store and the
    /// identity's bootstrap cache.
    fn end_session(&mut self, sign_out: bool) {
        let Some(session) = self.session.take() else {
            return;
        };
        tracing::info!("Closing session on {}", session.path);
        if let Some(subscription) = session.subscription {
            subscription.cancel();
        }
        self.scheduler.cancel_all();

        if sign_out {
            self.store.clear();
            if let Some(cache) = &self.cache {
                if let Err(error) = cache.remove(&session.identity) {
                    tracing::warn!("Failed to remove bootstrap cache: {error}");
                }
            }
        }
        self.populated = false;
        self.set_status(SyncStatus::new(SyncState::Disconnected));
    }

    fn require_session(&self) -> Result<()> {
        if self.session.is_some() {
            Ok(())
        } else {
            Err(Error::NoIdentity)
        }
    }

    fn write_cache(&self) {
        let (Some(cache), Some(session)) = (&self.cache, &self.session) else {
            return;
        };
        if let Err(error) = cache.store(&session.identity, self.store.records()) {
            tracing::warn!("Failed to write bootstrap cache: {error}");
        }
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            tracing::debug!("Sync status: {status}");
            *current = status;
            true
        });
    }
}
