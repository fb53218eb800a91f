use crate::errors::{AppError, AppResult};
use crate::storage::{SnapshotReceiver, StorageAdapter, StoredDocument};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

type WatcherMap = HashMap<String, Vec<mpsc::UnboundedSender<Vec<StoredDocument>>>>;

/// Document store on a single SQLite table. Array appends go through a JSON1
/// `json_insert` so they are atomic at the statement level; a concurrent
/// appender can never overwrite another's element.
#[derive(Debug)]
pub struct SqliteAdapter {
    conn: Mutex<Connection>,
    watchers: Mutex<WatcherMap>,
}

impl SqliteAdapter {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::from)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
            watchers: Mutex::new(HashMap::new()),
        })
    }

    fn lock_conn(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("storage mutex poisoned".to_string()))
    }

    fn lock_watchers(&self) -> AppResult<std::sync::MutexGuard<'_, WatcherMap>> {
        self.watchers
            .lock()
            .map_err(|_| AppError::Internal("watcher mutex poisoned".to_string()))
    }

    fn list(&self, collection: &str) -> AppResult<Vec<StoredDocument>> {
        let conn = self.lock_conn()?;
        let mut statement = conn.prepare(
            "SELECT id, created_at, data_json FROM documents
             WHERE collection = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = statement.query_map([collection], |row| {
            let id: String = row.get(0)?;
            let created_at: String = row.get(1)?;
            let data_json: String = row.get(2)?;
            Ok((id, created_at, data_json))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, created_at, data_json) = row?;
            let created_at = parse_timestamp(&created_at)?;
            let data: serde_json::Value = serde_json::from_str(&data_json)?;
            documents.push(StoredDocument { id, created_at, data });
        }
        Ok(documents)
    }

    /// Snapshot query and fan-out stay under the watcher lock so a delivery
    /// can never be followed by a staler one.
    fn notify(&self, collection: &str) -> AppResult<()> {
        let mut watchers = self.lock_watchers()?;
        let Some(senders) = watchers.get_mut(collection) else {
            return Ok(());
        };
        let snapshot = self.list(collection)?;
        senders.retain(|sender| sender.send(snapshot.clone()).is_ok());
        if senders.is_empty() {
            watchers.remove(collection);
        }
        Ok(())
    }
}

impl StorageAdapter for SqliteAdapter {
    fn create(&self, collection: &str, data: serde_json::Value) -> AppResult<StoredDocument> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let data_json = serde_json::to_string(&data)?;

        {
            let conn = self.lock_conn()?;
            conn.execute(
                "INSERT INTO documents (id, collection, data_json, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, collection, data_json, created_at.to_rfc3339()],
            )?;
        }
        self.notify(collection)?;

        Ok(StoredDocument { id, created_at, data })
    }

    fn update(&self, collection: &str, id: &str, partial: serde_json::Value) -> AppResult<()> {
        let partial_json = serde_json::to_string(&partial)?;
        let changed = {
            let conn = self.lock_conn()?;
            conn.execute(
                "UPDATE documents SET data_json = json_patch(data_json, json(?1))
                 WHERE collection = ?2 AND id = ?3",
                params![partial_json, collection, id],
            )?
        };
        if changed == 0 {
            return Err(AppError::NotFound(format!(
                "no document {} in {}",
                id, collection
            )));
        }
        self.notify(collection)
    }

    fn append_to_array(&self, collection: &str, id: &str, field: &str, value: serde_json::Value) -> AppResult<()> {
        let mut value = value;
        if let Some(object) = value.as_object_mut() {
            // Clients never supply clocks; a caller-provided stamp is replaced.
            object.insert("createdAt".to_string(), serde_json::to_value(Utc::now())?);
        }
        let value_json = serde_json::to_string(&value)?;

        let changed = {
            let conn = self.lock_conn()?;
            conn.execute(
                "UPDATE documents
                 SET data_json = json_insert(data_json, '$.' || ?1 || '[#]', json(?2))
                 WHERE collection = ?3 AND id = ?4",
                params![field, value_json, collection, id],
            )?
        };
        if changed == 0 {
            return Err(AppError::NotFound(format!(
                "no document {} in {}",
                id, collection
            )));
        }
        self.notify(collection)
    }

    fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        {
            let conn = self.lock_conn()?;
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )?;
        }
        self.notify(collection)
    }

    fn subscribe(&self, collection: &str) -> AppResult<SnapshotReceiver> {
        let mut watchers = self.lock_watchers()?;
        let snapshot = self.list(collection)?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(snapshot);
        watchers.entry(collection.to_string()).or_default().push(sender);
        Ok(receiver)
    }
}

fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| AppError::Internal(format!("bad stored timestamp {}: {}", raw, err)))
}
