//! SQLite-backed remote collection
//!
//! Stores every collection in a single `documents` table. Used by the CLI as
//! a persistent stand-in for a hosted document database; subscriptions see
//! writes issued through the same handle.
//!
//! Writes run on the blocking pool. The statement, the follow-up listing and
//! the broadcast share one connection lock, so listeners receive snapshots in
//! the order the writes were applied.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identity::CollectionPath;
use crate::models::RemoteDocument;

use super::listeners::Listeners;
use super::{RemoteChannel, RemoteEvent, Subscription};

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Document collection stored in a SQLite file.
#[derive(Clone)]
pub struct SqliteRemote {
    conn: Arc<Mutex<Connection>>,
    listeners: Listeners,
}

impl SqliteRemote {
    /// Open the collection store at the given path, creating it if needed.
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            listeners: Listeners::default(),
        })
    }

    /// Current listing of a collection, ordered by document id.
    pub fn documents(&self, path: &CollectionPath) -> Result<Vec<RemoteDocument>> {
        listing(&self.lock(), path)
    }

    /// Apply `write` on the blocking pool, then broadcast the new listing
    /// before releasing the connection.
    async fn write<F>(&self, path: &CollectionPath, write: F) -> Result<()>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<usize> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let listeners = self.listeners.clone();
        let path = path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            write(&conn).map_err(|error| Error::Transport(error.to_string()))?;
            let event = match listing(&conn, &path) {
                Ok(documents) => RemoteEvent::Snapshot(documents),
                Err(error) => RemoteEvent::Error(error.to_string()),
            };
            listeners.broadcast(&path, &event);
            Ok(())
        })
        .await
        .map_err(|error| Error::Transport(format!("write task failed: {error}")))?
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn listing(conn: &Connection, path: &CollectionPath) -> Result<Vec<RemoteDocument>> {
    let mut stmt =
        conn.prepare("SELECT id, body FROM documents WHERE collection = ? ORDER BY id")?;
    let rows = stmt.query_map(params![path.as_str()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut documents = Vec::new();
    for row in rows {
        let (id, body) = row?;
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(fields)) => documents.push(RemoteDocument::new(id, fields)),
            // Left for the decoder to reject, like any malformed document.
            Ok(_) | Err(_) => documents.push(RemoteDocument::new(id, Map::new())),
        }
    }
    Ok(documents)
}

impl RemoteChannel for SqliteRemote {
    fn subscribe(&self, path: &CollectionPath) -> Result<Subscription> {
        let conn = self.lock();
        let initial = listing(&conn, path)?;
        Ok(self
            .listeners
            .register(path, RemoteEvent::Snapshot(initial)))
    }

    async fn upsert(&self, path: &CollectionPath, document: RemoteDocument) -> Result<()> {
        let body = serde_json::to_string(&Value::Object(document.fields))?;
        let now = chrono::Utc::now().timestamp_millis();
        let collection = path.as_str().to_string();
        self.write(path, move |conn| {
            conn.execute(
                "INSERT INTO documents (collection, id, body, updated_at) VALUES (?, ?, ?, ?)
                 ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![collection, document.id, body, now],
            )
        })
        .await
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<()> {
        let collection = path.as_str().to_string();
        let id = id.to_string();
        self.write(path, move |conn| {
            conn.execute(
                "DELETE FROM documents WHERE collection = ? AND id = ?",
                params![collection, id],
            )
        })
        .await
    }
}

/// Run all pending migrations
fn migrate(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|value| value != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })
        .optional()?
        .flatten();

    Ok(version.unwrap_or(0))
}

/// Migration to version 1: Initial schema
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "BEGIN;
         CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);
         CREATE TABLE IF NOT EXISTS documents (
             collection TEXT NOT NULL,
             id TEXT NOT NULL,
             body TEXT NOT NULL,
             updated_at INTEGER NOT NULL,
             PRIMARY KEY (collection, id)
         );
         INSERT INTO schema_version (version) VALUES ({CURRENT_VERSION});
         COMMIT;"
    ))?;
    tracing::debug!("Applied document store migration v{CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use serde_json::json;

    fn path() -> CollectionPath {
        CollectionPath::for_identity(&Identity::new("user-1").unwrap())
    }

    fn doc(id: &str, name: &str) -> RemoteDocument {
        let Value::Object(fields) = json!({ "name": name }) else {
            unreachable!()
        };
        RemoteDocument::new(id, fields)
    }

    #[tokio::test]
    async fn upsert_overwrites_whole_document() {
        let remote = SqliteRemote::open_in_memory().unwrap();
        let Value::Object(fields) = json!({ "name": "old", "dueDate": "2030-01-01T00:00:00Z" })
        else {
            unreachable!()
        };
        remote
            .upsert(&path(), RemoteDocument::new("a", fields))
            .await
            .unwrap();
        remote.upsert(&path(), doc("a", "new")).await.unwrap();

        let documents = remote.documents(&path()).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].fields.get("name"), Some(&json!("new")));
        assert!(!documents[0].fields.contains_key("dueDate"));
    }

    #[tokio::test]
    async fn subscription_sees_writes() {
        let remote = SqliteRemote::open_in_memory().unwrap();
        let mut subscription = remote.subscribe(&path()).unwrap();
        assert_eq!(
            subscription.recv().await,
            Some(RemoteEvent::Snapshot(Vec::new()))
        );

        remote.upsert(&path(), doc("b", "second")).await.unwrap();
        remote.upsert(&path(), doc("a", "first")).await.unwrap();
        subscription.recv().await;
        match subscription.recv().await {
            Some(RemoteEvent::Snapshot(documents)) => {
                let ids: Vec<_> = documents.iter().map(|d| d.id.as_str()).collect();
                assert_eq!(ids, vec!["a", "b"]);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }

        remote.delete(&path(), "a").await.unwrap();
        match subscription.recv().await {
            Some(RemoteEvent::Snapshot(documents)) => assert_eq!(documents.len(), 1),
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_reach_listeners_in_write_order() {
        let remote = SqliteRemote::open_in_memory().unwrap();
        let mut subscription = remote.subscribe(&path()).unwrap();
        subscription.recv().await;

        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..16 {
            let remote = remote.clone();
            tasks.spawn(async move {
                remote
                    .upsert(&path(), doc(&format!("doc-{n:02}"), "item"))
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let mut sizes = Vec::new();
        while let Some(event) = subscription.try_recv() {
            match event {
                RemoteEvent::Snapshot(documents) => sizes.push(documents.len()),
                RemoteEvent::Error(message) => panic!("unexpected error event: {message}"),
            }
        }
        assert_eq!(sizes, (1..=16).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn documents_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("remote.db");

        let remote = SqliteRemote::open(&db_path).unwrap();
        remote.upsert(&path(), doc("a", "kept")).await.unwrap();
        drop(remote);

        let reopened = SqliteRemote::open(&db_path).unwrap();
        assert_eq!(reopened.documents(&path()).unwrap().len(), 1);
    }

    #[test]
    fn corrupt_bodies_surface_as_empty_documents() {
        let remote = SqliteRemote::open_in_memory().unwrap();
        remote
            .lock()
            .execute(
                "INSERT INTO documents (collection, id, body, updated_at) VALUES (?, 'bad', 'not json', 0)",
                params![path().as_str()],
            )
            .unwrap();

        let documents = remote.documents(&path()).unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].fields.is_empty());
    }
}
