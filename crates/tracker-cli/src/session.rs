//! Engine lifecycle for one CLI invocation.

use tokio::task::JoinHandle;
use tracker_core::config::EngineConfig;
use tracker_core::notify::NotificationScheduler;
use tracker_core::remote::SqliteRemote;
use tracker_core::sync::{spawn, EngineHandle};
use tracker_core::{Identity, IdentityProvider, LocalIdentityProvider, SyncEngine, SyncState, SyncStatus};

use crate::error::CliError;
use crate::identity_store::{load_identity, DataPaths};
use crate::reminders::LogNotificationCenter;

pub struct TrackerSession {
    pub handle: EngineHandle,
    provider: LocalIdentityProvider,
    identity: Identity,
    task: JoinHandle<()>,
}

/// Start the engine for the stored identity.
pub async fn open_session(paths: &DataPaths) -> Result<TrackerSession, CliError> {
    let identity = load_identity(&paths.identity_file())?.ok_or(CliError::NotSignedIn)?;
    open_session_as(paths, identity).await
}

/// Start the engine for `identity` and wait until the first snapshot is in.
pub async fn open_session_as(
    paths: &DataPaths,
    identity: Identity,
) -> Result<TrackerSession, CliError> {
    start(paths, identity, EngineConfig::from_env()).await
}

/// Sign `identity` out through the engine, dropping its local data.
pub async fn sign_out(paths: &DataPaths, identity: Identity) -> Result<(), CliError> {
    let config = EngineConfig {
        seed_defaults: false,
        ..EngineConfig::from_env()
    };
    let session = start(paths, identity, config).await?;
    session.provider.sign_out();
    session
        .handle
        .wait_for_status(|status| status.state == SyncState::Disconnected)
        .await?;
    session.close().await?;
    Ok(())
}

async fn start(
    paths: &DataPaths,
    identity: Identity,
    mut config: EngineConfig,
) -> Result<TrackerSession, CliError> {
    if config.cache_dir.is_none() {
        config.cache_dir = Some(paths.cache_dir());
    }

    let remote = SqliteRemote::open(&paths.db_path)?;
    let scheduler = NotificationScheduler::new(LogNotificationCenter::new());
    let engine = SyncEngine::new(remote, scheduler, &config)?;

    let provider = LocalIdentityProvider::new(Some(identity.clone()));
    let (handle, task) = spawn(engine, provider.subscribe());

    let status = handle
        .wait_for_status(|status| matches!(status.state, SyncState::Synced | SyncState::Error))
        .await?;
    if status.is_error() {
        tracing::warn!("Starting with {status}");
    }
    // A fresh guest session seeds on its first snapshot.
    handle.flush().await?;

    Ok(TrackerSession {
        handle,
        provider,
        identity,
        task,
    })
}

impl TrackerSession {
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Wait for outstanding pushes, stop the engine and report the last
    /// status it had.
    pub async fn close(self) -> Result<SyncStatus, CliError> {
        self.handle.flush().await?;
        let status = self.handle.status();
        drop(self.handle);
        self.task.await?;
        Ok(status)
    }
}
