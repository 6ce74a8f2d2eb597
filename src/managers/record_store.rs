//! Record Store for readlist.
//!
//! Holds the authoritative local snapshot of bookmark records for the current
//! session. Local mutations are synchronous and total: they operate on
//! whatever snapshot is currently held and never fail. Each mutation runs as
//! a single write section, so readers always observe either the pre-mutation
//! or the post-mutation snapshot, never a partial one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::services::persistence::PersistenceService;
use crate::types::bookmark::{Bookmark, BookmarkPatch};
use crate::types::errors::BookmarkError;

/// Trait defining the record store interface.
pub trait RecordStoreTrait {
    /// Atomically swaps the entire snapshot.
    fn replace_all(&self, records: Vec<Bookmark>);
    /// Inserts a record at the front of the snapshot. Idempotent: inserting
    /// an id that already exists is a no-op, so a confirmed optimistic create
    /// and its change-feed echo cannot produce a duplicate.
    fn insert(&self, record: Bookmark);
    /// Replaces the record with the same id, or inserts it when unknown.
    fn upsert(&self, record: Bookmark);
    /// Atomic id swap: replaces the record whose id is `match_id` with
    /// `record` in place, visible as a single update. If `record.id` is
    /// already present (the change feed won the race), the `match_id`
    /// leftover is dropped instead.
    fn reconcile(&self, match_id: &str, record: Bookmark);
    /// Applies a partial update to the record with the given id.
    /// A no-op when the id is absent.
    fn patch(&self, id: &str, patch: &BookmarkPatch);
    /// Removes the record with the given id. A no-op when absent.
    fn remove(&self, id: &str);
    /// Removes every record whose id appears in `ids`.
    fn remove_many(&self, ids: &[String]);
    /// Clone of the current snapshot.
    fn snapshot(&self) -> Vec<Bookmark>;
    fn get(&self, id: &str) -> Option<Bookmark>;
    fn contains(&self, id: &str) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    /// Subscribes to change notifications. Each completed mutation that
    /// changed the snapshot delivers its revision number to every live
    /// subscriber; dropped receivers are pruned on the next notification.
    fn subscribe(&self) -> Receiver<u64>;
}

/// In-memory record store for the current user session.
pub struct RecordStore {
    records: RwLock<Vec<Bookmark>>,
    revision: AtomicU64,
    subscribers: Mutex<Vec<Sender<u64>>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            revision: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    // Lock accessors recover from poisoning: a panicked writer can only have
    // left a fully swapped or fully untouched snapshot behind.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Bookmark>> {
        self.records.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Bookmark>> {
        self.records.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Fetches the full collection for `owner` from the backend, ordered by
    /// creation time descending, and swaps it in. This is both the initial
    /// load and the rollback path after a failed optimistic mutation.
    pub async fn load(
        &self,
        backend: &dyn PersistenceService,
        owner: &str,
    ) -> Result<usize, BookmarkError> {
        let mut records = backend.fetch_all(owner).await.map_err(|e| {
            BookmarkError::OperationFailed {
                action: "load bookmarks",
                message: e.to_string(),
            }
        })?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let count = records.len();
        self.replace_all(records);
        Ok(count)
    }

    fn notify(&self) {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        subscribers.retain(|tx| tx.send(revision).is_ok());
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStoreTrait for RecordStore {
    fn replace_all(&self, records: Vec<Bookmark>) {
        let now = Self::now_ms();
        let count = records.len();
        {
            let mut guard = self.write();
            *guard = records;
            for record in guard.iter_mut() {
                record.normalize(now);
            }
        }
        tracing::debug!(count, "record store snapshot replaced");
        self.notify();
    }

    fn insert(&self, record: Bookmark) {
        let mut record = record;
        record.normalize(Self::now_ms());
        let inserted = {
            let mut guard = self.write();
            if guard.iter().any(|b| b.id == record.id) {
                false
            } else {
                guard.insert(0, record);
                true
            }
        };
        if inserted {
            self.notify();
        }
    }

    fn upsert(&self, record: Bookmark) {
        let mut record = record;
        record.normalize(Self::now_ms());
        {
            let mut guard = self.write();
            match guard.iter_mut().find(|b| b.id == record.id) {
                Some(existing) => *existing = record,
                None => guard.insert(0, record),
            }
        }
        self.notify();
    }

    fn reconcile(&self, match_id: &str, record: Bookmark) {
        let mut record = record;
        record.normalize(Self::now_ms());
        {
            let mut guard = self.write();
            let confirmed_exists =
                record.id != match_id && guard.iter().any(|b| b.id == record.id);
            if confirmed_exists {
                // The change feed already delivered the confirmed record;
                // drop the optimistic leftover and keep the server fields.
                guard.retain(|b| b.id != match_id);
                if let Some(existing) = guard.iter_mut().find(|b| b.id == record.id) {
                    *existing = record;
                }
            } else if let Some(existing) = guard.iter_mut().find(|b| b.id == match_id) {
                *existing = record;
            } else {
                guard.insert(0, record);
            }
        }
        self.notify();
    }

    fn patch(&self, id: &str, patch: &BookmarkPatch) {
        let now = Self::now_ms();
        let changed = {
            let mut guard = self.write();
            match guard.iter_mut().find(|b| b.id == id) {
                Some(record) => {
                    patch.apply_to(record, now);
                    true
                }
                None => false,
            }
        };
        if changed {
            self.notify();
        }
    }

    fn remove(&self, id: &str) {
        let removed = {
            let mut guard = self.write();
            let before = guard.len();
            guard.retain(|b| b.id != id);
            guard.len() != before
        };
        if removed {
            self.notify();
        }
    }

    fn remove_many(&self, ids: &[String]) {
        let removed = {
            let mut guard = self.write();
            let before = guard.len();
            guard.retain(|b| !ids.iter().any(|id| *id == b.id));
            guard.len() != before
        };
        if removed {
            self.notify();
        }
    }

    fn snapshot(&self) -> Vec<Bookmark> {
        self.read().clone()
    }

    fn get(&self, id: &str) -> Option<Bookmark> {
        self.read().iter().find(|b| b.id == id).cloned()
    }

    fn contains(&self, id: &str) -> bool {
        self.read().iter().any(|b| b.id == id)
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn subscribe(&self) -> Receiver<u64> {
        let (tx, rx) = channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(tx);
        rx
    }
}
