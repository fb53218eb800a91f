use crate::errors::{AppError, AppResult};
use crate::models::{Entry, EntryContent, EntryDraft, EntryPatch, Reply, ReplyDraft, ThreadKind};
use crate::redaction::preview;
use crate::storage::{SnapshotReceiver, StorageAdapter, StoredDocument};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

type SnapshotListener = Box<dyn Fn(&[Entry]) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: HashMap<u64, SnapshotListener>,
    latest: Option<Vec<Entry>>,
    pump: Option<tokio::task::JoinHandle<()>>,
}

/// Canonical collection of entries for one thread kind. All reads and writes
/// go through the injected adapter; mutations become visible to subscribers
/// only through the next snapshot, never synchronously.
pub struct EntryStore {
    adapter: Arc<dyn StorageAdapter>,
    kind: ThreadKind,
    table: Arc<Mutex<ListenerTable>>,
}

/// Handle returned by `subscribe`. Cancelling removes the listener; when the
/// last listener leaves, the adapter-side subscription is released too.
pub struct Subscription {
    id: u64,
    table: Arc<Mutex<ListenerTable>>,
}

impl Subscription {
    pub async fn cancel(self) {
        let mut table = self.table.lock().await;
        table.listeners.remove(&self.id);
        if table.listeners.is_empty() {
            if let Some(pump) = table.pump.take() {
                pump.abort();
            }
            table.latest = None;
        }
    }
}

impl EntryStore {
    pub fn new(adapter: Arc<dyn StorageAdapter>, kind: ThreadKind) -> Self {
        Self {
            adapter,
            kind,
            table: Arc::new(Mutex::new(ListenerTable::default())),
        }
    }

    pub fn kind(&self) -> ThreadKind {
        self.kind
    }

    pub async fn subscribe(
        &self,
        listener: impl Fn(&[Entry]) + Send + Sync + 'static,
    ) -> AppResult<Subscription> {
        let mut table = self.table.lock().await;
        if table.pump.is_none() {
            let receiver = self.adapter.subscribe(self.kind.collection())?;
            table.pump = Some(tokio::spawn(pump_snapshots(
                receiver,
                self.table.clone(),
                self.kind,
            )));
        } else if let Some(latest) = &table.latest {
            // Late subscribers get the current snapshot right away; the pump
            // only wakes them on the next remote change.
            listener(latest);
        }

        let id = table.next_id;
        table.next_id += 1;
        table.listeners.insert(id, Box::new(listener));
        Ok(Subscription {
            id,
            table: self.table.clone(),
        })
    }

    /// Returns `Ok(None)` without touching storage when required text is
    /// blank after trimming; the original UI treats that as a silent skip.
    pub async fn create(&self, draft: EntryDraft) -> AppResult<Option<String>> {
        if draft.content.kind() != self.kind {
            return Err(AppError::Internal(format!(
                "{} draft submitted to {} store",
                draft.content.kind().as_str(),
                self.kind.as_str()
            )));
        }
        let Some(content) = draft.content.normalized() else {
            tracing::debug!(collection = self.kind.collection(), "skipped blank entry draft");
            return Ok(None);
        };

        let doc = EntryDoc {
            author: draft.author,
            recipient: draft.recipient,
            content,
            replies: Vec::new(),
        };
        let stored = self
            .adapter
            .create(self.kind.collection(), serde_json::to_value(&doc)?)?;
        tracing::info!(
            collection = self.kind.collection(),
            id = %stored.id,
            author = %doc.author,
            "entry created"
        );
        Ok(Some(stored.id))
    }

    /// Delegates to the adapter's atomic array append; a read-modify-write
    /// cycle here would lose concurrent replies from the partner's client.
    pub async fn append_reply(&self, id: &str, draft: ReplyDraft) -> AppResult<()> {
        let body = draft.body.trim();
        if body.is_empty() {
            tracing::debug!(collection = self.kind.collection(), id, "skipped blank reply");
            return Ok(());
        }
        let value = serde_json::json!({ "author": draft.author, "body": body });
        self.adapter
            .append_to_array(self.kind.collection(), id, "replies", value)?;
        tracing::debug!(
            collection = self.kind.collection(),
            id,
            body = %preview(body),
            "reply appended"
        );
        Ok(())
    }

    /// Merges only the named fields; `replies` is never reachable from a patch.
    pub async fn update(&self, id: &str, patch: EntryPatch) -> AppResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let trimmed = EntryPatch {
            body: patch.body.map(|text| text.trim().to_string()),
            mood: patch.mood,
            problem: patch.problem.map(|text| text.trim().to_string()),
            resolution: patch.resolution.map(|text| text.trim().to_string()),
        };
        self.adapter
            .update(self.kind.collection(), id, serde_json::to_value(&trimmed)?)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.adapter.delete(self.kind.collection(), id)?;
        tracing::info!(collection = self.kind.collection(), id, "entry deleted");
        Ok(())
    }
}

/// Shape of the payload the adapter stores; identity and creation time live
/// on the adapter side.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryDoc {
    author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipient: Option<String>,
    #[serde(flatten)]
    content: EntryContent,
    #[serde(default)]
    replies: Vec<Reply>,
}

async fn pump_snapshots(mut receiver: SnapshotReceiver, table: Arc<Mutex<ListenerTable>>, kind: ThreadKind) {
    // One snapshot at a time, in receipt order.
    while let Some(snapshot) = receiver.recv().await {
        let entries = decode_snapshot(kind, snapshot);
        let mut table = table.lock().await;
        for listener in table.listeners.values() {
            listener(&entries);
        }
        table.latest = Some(entries);
    }
}

fn decode_snapshot(kind: ThreadKind, snapshot: Vec<StoredDocument>) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(snapshot.len());
    for document in snapshot {
        match serde_json::from_value::<EntryDoc>(document.data) {
            Ok(doc) => entries.push(Entry {
                id: document.id,
                author: doc.author,
                recipient: doc.recipient,
                content: doc.content,
                created_at: document.created_at,
                replies: doc.replies,
            }),
            Err(err) => {
                tracing::warn!(
                    collection = kind.collection(),
                    id = %document.id,
                    %err,
                    "dropping undecodable document from snapshot"
                );
            }
        }
    }
    entries
}
