pub mod errors;
pub mod logging;
pub mod models;
pub mod projection;
pub mod redaction;
pub mod session;
pub mod storage;
pub mod store;

pub use errors::{AppError, AppResult};
pub use models::{Entry, EntryContent, EntryDraft, EntryPatch, Mood, Reply, ReplyDraft, ThreadKind};
pub use projection::{project, ThreadColumns};
pub use session::{PairSpace, SessionContext};
pub use storage::{SnapshotReceiver, SqliteAdapter, StorageAdapter, StoredDocument};
pub use store::{EntryStore, Subscription};
