//! Dedicated reconciliation loop
//!
//! [`spawn`] moves a [`SyncEngine`] onto its own task. The task multiplexes
//! identity changes, remote events, push results and commands from any
//! number of [`EngineHandle`]s, so the engine stays single-owner.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::models::{Record, RecordDraft, RecordId};
use crate::notify::NotificationCenter;
use crate::remote::RemoteChannel;
use crate::store::RecordsView;

use super::engine::SyncEngine;
use super::status::SyncStatus;

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

/// Boxed update mutator carried to the engine task.
pub type RecordEdit = Box<dyn FnOnce(&mut Record) + Send>;

enum EngineCommand {
    Add(RecordDraft, Reply<RecordId>),
    Update(RecordId, RecordEdit, Reply<Record>),
    ToggleCompleted(RecordId, Reply<Record>),
    Delete(RecordId, Reply<()>),
    Resubscribe(Reply<()>),
    Flush(oneshot::Sender<()>),
}

/// Cloneable front end of an engine running on its own task.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
    records: watch::Receiver<RecordsView>,
    status: watch::Receiver<SyncStatus>,
}

/// Run `engine` on a new task, following `identity` for sign-in changes.
///
/// The task ends, shutting the engine down, once every handle is dropped or
/// the identity source goes away.
pub fn spawn<R, N>(
    engine: SyncEngine<R, N>,
    identity: watch::Receiver<Option<Identity>>,
) -> (EngineHandle, JoinHandle<()>)
where
    R: RemoteChannel,
    N: NotificationCenter + 'static,
{
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let handle = EngineHandle {
        commands: commands_tx,
        records: engine.subscribe_records(),
        status: engine.subscribe_status(),
    };
    let task = tokio::spawn(run(engine, identity, commands_rx));
    (handle, task)
}

async fn run<R, N>(
    mut engine: SyncEngine<R, N>,
    mut identity: watch::Receiver<Option<Identity>>,
    mut commands: mpsc::Receiver<EngineCommand>,
) where
    R: RemoteChannel,
    N: NotificationCenter,
{
    let initial = identity.borrow_and_update().clone();
    engine.set_identity(initial);

    loop {
        tokio::select! {
            changed = identity.changed() => {
                if changed.is_err() {
                    tracing::debug!("Identity source closed");
                    break;
                }
                let next = identity.borrow_and_update().clone();
                engine.set_identity(next);
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                execute(&mut engine, command).await;
            }
            () = engine.process_next() => {}
        }
    }

    engine.shutdown();
    tracing::debug!("Sync engine task stopped");
}

async fn execute<R, N>(engine: &mut SyncEngine<R, N>, command: EngineCommand)
where
    R: RemoteChannel,
    N: NotificationCenter,
{
    // A caller that stopped waiting for its reply is not an error.
    match command {
        EngineCommand::Add(draft, reply) => {
            let _ = reply.send(engine.add(draft));
        }
        EngineCommand::Update(id, edit, reply) => {
            let _ = reply.send(engine.update(&id, edit));
        }
        EngineCommand::ToggleCompleted(id, reply) => {
            let _ = reply.send(engine.toggle_completed(&id));
        }
        EngineCommand::Delete(id, reply) => {
            let _ = reply.send(engine.delete(&id));
        }
        EngineCommand::Resubscribe(reply) => {
            let _ = reply.send(engine.resubscribe());
        }
        EngineCommand::Flush(reply) => {
            engine.flush_pushes().await;
            engine.process_pending();
            let _ = reply.send(());
        }
    }
}

impl EngineHandle {
    /// Create a record; returns once the record is in the store.
    pub async fn add(&self, draft: RecordDraft) -> Result<RecordId> {
        self.request(|reply| EngineCommand::Add(draft, reply)).await
    }

    pub async fn update(
        &self,
        id: RecordId,
        mutator: impl FnOnce(&mut Record) + Send + 'static,
    ) -> Result<Record> {
        let edit: RecordEdit = Box::new(mutator);
        self.request(|reply| EngineCommand::Update(id, edit, reply))
            .await
    }

    pub async fn toggle_completed(&self, id: RecordId) -> Result<Record> {
        self.request(|reply| EngineCommand::ToggleCompleted(id, reply))
            .await
    }

    pub async fn delete(&self, id: RecordId) -> Result<()> {
        self.request(|reply| EngineCommand::Delete(id, reply)).await
    }

    pub async fn resubscribe(&self) -> Result<()> {
        self.request(EngineCommand::Resubscribe).await
    }

    /// Wait for pushes in flight and apply whatever they caused.
    pub async fn flush(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(EngineCommand::Flush(reply))
            .await
            .map_err(|_| Error::EngineStopped)?;
        response.await.map_err(|_| Error::EngineStopped)
    }

    /// Current record set.
    pub fn records(&self) -> RecordsView {
        self.records.borrow().clone()
    }

    pub fn watch_records(&self) -> watch::Receiver<RecordsView> {
        self.records.clone()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    /// Wait until the status satisfies `ready`, returning it.
    pub async fn wait_for_status(
        &self,
        ready: impl Fn(&SyncStatus) -> bool,
    ) -> Result<SyncStatus> {
        let mut status = self.status.clone();
        let reached = status
            .wait_for(|current| ready(current))
            .await
            .map_err(|_| Error::EngineStopped)?;
        Ok(reached.clone())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> EngineCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| Error::EngineStopped)?;
        response.await.map_err(|_| Error::EngineStopped)?
    }
}
