use our_space_journal::{
    project, EntryContent, EntryDraft, EntryPatch, EntryStore, Mood, PairSpace, ReplyDraft,
    SqliteAdapter, ThreadKind,
};
use our_space_journal::Entry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

type SnapshotRx = mpsc::UnboundedReceiver<Vec<Entry>>;

async fn watch(store: &EntryStore) -> (our_space_journal::Subscription, SnapshotRx) {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = store
        .subscribe(move |entries: &[Entry]| {
            let _ = tx.send(entries.to_vec());
        })
        .await
        .expect("subscribe");
    (subscription, rx)
}

async fn next_snapshot(rx: &mut SnapshotRx) -> Vec<Entry> {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("snapshot within deadline")
        .expect("subscription still live")
}

#[tokio::test]
async fn note_lifecycle_end_to_end() {
    let adapter = Arc::new(SqliteAdapter::in_memory().expect("open adapter"));
    let store = EntryStore::new(adapter, ThreadKind::Improvement);
    let (_subscription, mut rx) = watch(&store).await;

    let initial = next_snapshot(&mut rx).await;
    assert!(initial.is_empty());

    let id = store
        .create(EntryDraft {
            author: "James".to_string(),
            recipient: Some("Ari".to_string()),
            content: EntryContent::Note {
                body: "  Let's talk  ".to_string(),
            },
        })
        .await
        .expect("create")
        .expect("non-blank draft");

    let after_create = next_snapshot(&mut rx).await;
    assert_eq!(after_create.len(), 1);
    assert_eq!(after_create[0].id, id);
    assert_eq!(
        after_create[0].content,
        EntryContent::Note {
            body: "Let's talk".to_string()
        }
    );

    // Two-column projection for both viewers of the same snapshot.
    let as_ari = project(&after_create, "Ari", "James");
    assert!(as_ari.mine.is_empty());
    assert_eq!(as_ari.theirs[0].id, id);
    let as_james = project(&after_create, "James", "Ari");
    assert_eq!(as_james.mine[0].id, id);
    assert!(as_james.theirs.is_empty());

    store
        .append_reply(&id, ReplyDraft {
            author: "Ari".to_string(),
            body: "Okay".to_string(),
        })
        .await
        .expect("append reply");

    let after_reply = next_snapshot(&mut rx).await;
    assert_eq!(after_reply[0].replies.len(), 1);
    assert_eq!(after_reply[0].replies[0].author, "Ari");
    assert_eq!(after_reply[0].replies[0].body, "Okay");

    store.delete(&id).await.expect("delete");
    let after_delete = next_snapshot(&mut rx).await;
    assert!(after_delete.is_empty());

    // Idempotent: the entry is already gone.
    store.delete(&id).await.expect("second delete");
}

#[tokio::test]
async fn concurrent_replies_are_never_lost() {
    let adapter = Arc::new(SqliteAdapter::in_memory().expect("open adapter"));

    // Each user runs an independent store against the shared backend.
    let james_store = Arc::new(EntryStore::new(adapter.clone(), ThreadKind::Reflection));
    let ari_store = Arc::new(EntryStore::new(adapter.clone(), ThreadKind::Reflection));

    let id = james_store
        .create(EntryDraft {
            author: "James".to_string(),
            recipient: None,
            content: EntryContent::Reflection {
                body: "long week".to_string(),
                mood: Mood::Down,
            },
        })
        .await
        .expect("create")
        .expect("non-blank draft");

    let james_reply = {
        let store = james_store.clone();
        let id = id.clone();
        tokio::spawn(async move {
            store
                .append_reply(&id, ReplyDraft {
                    author: "James".to_string(),
                    body: "it gets better".to_string(),
                })
                .await
        })
    };
    let ari_reply = {
        let store = ari_store.clone();
        let id = id.clone();
        tokio::spawn(async move {
            store
                .append_reply(&id, ReplyDraft {
                    author: "Ari".to_string(),
                    body: "I'm here for you".to_string(),
                })
                .await
        })
    };
    james_reply.await.expect("join").expect("james append");
    ari_reply.await.expect("join").expect("ari append");

    let (_subscription, mut rx) = watch(&ari_store).await;
    let snapshot = next_snapshot(&mut rx).await;
    let replies = &snapshot[0].replies;
    assert_eq!(replies.len(), 2, "a concurrent reply was lost");
    assert!(replies.iter().any(|reply| reply.author == "James"));
    assert!(replies.iter().any(|reply| reply.author == "Ari"));
}

#[tokio::test]
async fn testament_resolution_fill_in_preserves_replies() {
    let adapter = Arc::new(SqliteAdapter::in_memory().expect("open adapter"));
    let store = EntryStore::new(adapter, ThreadKind::Testament);
    let (_subscription, mut rx) = watch(&store).await;
    assert!(next_snapshot(&mut rx).await.is_empty());

    let id = store
        .create(EntryDraft {
            author: "James".to_string(),
            recipient: None,
            content: EntryContent::Testament {
                problem: "leaves dishes in the sink".to_string(),
                resolution: String::new(),
            },
        })
        .await
        .expect("create")
        .expect("non-blank draft");
    next_snapshot(&mut rx).await;

    store
        .append_reply(&id, ReplyDraft {
            author: "Ari".to_string(),
            body: "noted".to_string(),
        })
        .await
        .expect("append reply");
    next_snapshot(&mut rx).await;

    store
        .update(&id, EntryPatch {
            resolution: Some("  wash up every evening  ".to_string()),
            ..EntryPatch::default()
        })
        .await
        .expect("fill in resolution");

    let snapshot = next_snapshot(&mut rx).await;
    assert_eq!(
        snapshot[0].content,
        EntryContent::Testament {
            problem: "leaves dishes in the sink".to_string(),
            resolution: "wash up every evening".to_string(),
        }
    );
    assert_eq!(snapshot[0].replies.len(), 1, "patch must not touch replies");
}

#[tokio::test]
async fn updating_a_deleted_entry_fails_with_not_found() {
    let adapter = Arc::new(SqliteAdapter::in_memory().expect("open adapter"));
    let store = EntryStore::new(adapter, ThreadKind::Testament);

    let id = store
        .create(EntryDraft {
            author: "James".to_string(),
            recipient: None,
            content: EntryContent::Testament {
                problem: "interrupts constantly".to_string(),
                resolution: String::new(),
            },
        })
        .await
        .expect("create")
        .expect("non-blank draft");
    store.delete(&id).await.expect("delete");

    let err = store
        .update(&id, EntryPatch {
            resolution: Some("listen first".to_string()),
            ..EntryPatch::default()
        })
        .await
        .expect_err("nothing left to merge into");
    assert!(matches!(err, our_space_journal::AppError::NotFound(_)));
}

#[tokio::test]
async fn late_subscriber_gets_current_snapshot_immediately() {
    let adapter = Arc::new(SqliteAdapter::in_memory().expect("open adapter"));
    let store = EntryStore::new(adapter, ThreadKind::Improvement);

    let (_first, mut first_rx) = watch(&store).await;
    assert!(next_snapshot(&mut first_rx).await.is_empty());

    store
        .create(EntryDraft {
            author: "Ari".to_string(),
            recipient: Some("James".to_string()),
            content: EntryContent::Note {
                body: "already here".to_string(),
            },
        })
        .await
        .expect("create")
        .expect("non-blank draft");
    assert_eq!(next_snapshot(&mut first_rx).await.len(), 1);

    let (_second, mut second_rx) = watch(&store).await;
    let snapshot = next_snapshot(&mut second_rx).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].author, "Ari");
}

#[tokio::test]
async fn cancelled_subscription_stops_delivery() {
    let adapter = Arc::new(SqliteAdapter::in_memory().expect("open adapter"));
    let store = EntryStore::new(adapter, ThreadKind::Improvement);

    let (subscription, mut rx) = watch(&store).await;
    assert!(next_snapshot(&mut rx).await.is_empty());
    subscription.cancel().await;

    store
        .create(EntryDraft {
            author: "James".to_string(),
            recipient: Some("Ari".to_string()),
            content: EntryContent::Note {
                body: "nobody listening".to_string(),
            },
        })
        .await
        .expect("create")
        .expect("non-blank draft");

    // The listener (and its sender) was dropped on cancel.
    let outcome = timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(matches!(outcome, Ok(None)));
}

#[tokio::test]
async fn entries_survive_reopening_the_database() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("space.db");

    {
        let adapter = Arc::new(SqliteAdapter::new(&path).expect("open adapter"));
        let store = EntryStore::new(adapter, ThreadKind::Reflection);
        store
            .create(EntryDraft {
                author: "Ari".to_string(),
                recipient: None,
                content: EntryContent::Reflection {
                    body: "good morning".to_string(),
                    mood: Mood::Happy,
                },
            })
            .await
            .expect("create")
            .expect("non-blank draft");
    }

    let adapter = Arc::new(SqliteAdapter::new(&path).expect("reopen adapter"));
    let store = EntryStore::new(adapter, ThreadKind::Reflection);
    let (_subscription, mut rx) = watch(&store).await;
    let snapshot = next_snapshot(&mut rx).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        snapshot[0].content,
        EntryContent::Reflection {
            body: "good morning".to_string(),
            mood: Mood::Happy,
        }
    );
}

#[tokio::test]
async fn session_context_feeds_the_projection() {
    let space = PairSpace::our_space();
    let session = space.authenticate("Ari", "Carter").expect("valid login");

    let adapter = Arc::new(SqliteAdapter::in_memory().expect("open adapter"));
    let store = EntryStore::new(adapter, ThreadKind::Improvement);
    let (_subscription, mut rx) = watch(&store).await;
    assert!(next_snapshot(&mut rx).await.is_empty());

    store
        .create(EntryDraft {
            author: session.partner.clone(),
            recipient: Some(session.current_user.clone()),
            content: EntryContent::Note {
                body: "please call your mother".to_string(),
            },
        })
        .await
        .expect("create")
        .expect("non-blank draft");

    let snapshot = next_snapshot(&mut rx).await;
    let columns = project(&snapshot, &session.current_user, &session.partner);
    assert!(columns.mine.is_empty());
    assert_eq!(columns.theirs.len(), 1);
}
