//! Unit tests for the MutationCoordinator public API.
//!
//! These exercise the optimistic-apply / commit / rollback protocol against
//! an in-memory fake persistence service: validation before mutation, the
//! atomic temp-id swap on confirmed creates, idempotent tag operations, the
//! bulk operations, and the reload-based rollback on backend failure.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use readlist::managers::mutation_coordinator::MutationCoordinator;
use readlist::managers::record_store::{RecordStore, RecordStoreTrait};
use readlist::services::persistence::PersistenceService;
use readlist::types::bookmark::{Bookmark, BookmarkPatch, NewBookmark, ReadStatus};
use readlist::types::errors::{BackendError, BookmarkError};

const OWNER: &str = "user-1";

fn record(id: &str, status: ReadStatus, created_at: i64) -> Bookmark {
    Bookmark {
        id: id.to_string(),
        owner: OWNER.to_string(),
        url: format!("https://example.com/{id}"),
        title: format!("Record {id}"),
        favicon_url: None,
        notes: None,
        status,
        completed_at: match status {
            ReadStatus::Completed => Some(created_at),
            _ => None,
        },
        priority: 0,
        tags: Vec::new(),
        created_at,
    }
}

/// In-memory stand-in for the backend of record. Reads always succeed so the
/// rollback-by-reload path can restore authoritative state; writes can be
/// made to fail or to block on a gate.
struct MockBackend {
    records: Mutex<Vec<Bookmark>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
    create_gate: Option<Arc<Notify>>,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MockBackend {
    fn new(seed: Vec<Bookmark>) -> Self {
        Self {
            records: Mutex::new(seed),
            next_id: AtomicU64::new(1),
            fail_writes: AtomicBool::new(false),
            create_gate: None,
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    fn gated(seed: Vec<Bookmark>, gate: Arc<Notify>) -> Self {
        let mut backend = Self::new(seed);
        backend.create_gate = Some(gate);
        backend
    }

    fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(BackendError("simulated transport failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceService for MockBackend {
    async fn fetch_all(&self, owner: &str) -> Result<Vec<Bookmark>, BackendError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect())
    }

    async fn create(&self, fields: NewBookmark) -> Result<Bookmark, BackendError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.create_gate {
            gate.notified().await;
        }
        self.check_writes()?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let confirmed = Bookmark {
            id: format!("srv-{n}"),
            owner: fields.owner,
            url: fields.url,
            title: fields.title,
            favicon_url: fields.favicon_url,
            notes: fields.notes,
            status: fields.status,
            completed_at: None,
            priority: fields.priority,
            tags: fields.tags,
            created_at: 1_000_000 + n as i64,
        };
        self.records.lock().unwrap().push(confirmed.clone());
        Ok(confirmed)
    }

    async fn update(&self, id: &str, patch: BookmarkPatch) -> Result<Bookmark, BackendError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writes()?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| BackendError(format!("no such record: {id}")))?;
        patch.apply_to(record, 2_000_000);
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writes()?;
        self.records.lock().unwrap().retain(|b| b.id != id);
        Ok(())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<(), BackendError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writes()?;
        self.records
            .lock()
            .unwrap()
            .retain(|b| !ids.contains(&b.id));
        Ok(())
    }
}

async fn setup(seed: Vec<Bookmark>) -> (Arc<RecordStore>, Arc<MockBackend>, MutationCoordinator) {
    let store = Arc::new(RecordStore::new());
    let backend = Arc::new(MockBackend::new(seed));
    let coordinator = MutationCoordinator::new(Arc::clone(&store), backend.clone());
    coordinator.reload(OWNER).await.unwrap();
    (store, backend, coordinator)
}

#[tokio::test]
async fn test_add_bookmark_confirms_with_server_id() {
    let (store, _, coordinator) = setup(Vec::new()).await;

    let created = coordinator
        .add_bookmark(OWNER, "https://example.com", Some("Ex"), None)
        .await
        .unwrap();

    assert!(created.id.starts_with("srv-"));
    assert_eq!(created.title, "Ex");
    assert_eq!(created.status, ReadStatus::Unread);
    assert_eq!(created.priority, 0);
    assert!(created.tags.is_empty());

    assert_eq!(store.len(), 1);
    let held = store.get(&created.id).unwrap();
    assert!(!held.has_temp_id(), "temp id must be swapped for the server id");
}

#[tokio::test]
async fn test_add_bookmark_without_title_derives_domain() {
    let (_, _, coordinator) = setup(Vec::new()).await;
    let created = coordinator
        .add_bookmark(OWNER, "https://www.rust-lang.org/learn", None, None)
        .await
        .unwrap();
    assert_eq!(created.title, "rust-lang.org");
    assert!(created.favicon_url.is_some());
}

#[tokio::test]
async fn test_add_bookmark_rejects_invalid_url_before_any_mutation() {
    let (store, backend, coordinator) = setup(Vec::new()).await;

    let err = coordinator
        .add_bookmark(OWNER, "ftp://x.com", Some("Nope"), None)
        .await
        .unwrap_err();

    assert_eq!(err, BookmarkError::InvalidUrl("ftp://x.com".to_string()));
    assert!(store.is_empty(), "no temporary record may leak");
    assert_eq!(backend.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_optimistic_create_is_visible_before_confirmation() {
    let gate = Arc::new(Notify::new());
    let store = Arc::new(RecordStore::new());
    let backend = Arc::new(MockBackend::gated(Vec::new(), Arc::clone(&gate)));
    let coordinator = Arc::new(MutationCoordinator::new(Arc::clone(&store), backend));

    let task = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator
                .add_bookmark(OWNER, "https://example.com", Some("Ex"), None)
                .await
        })
    };

    // Let the spawned operation run up to the gated backend call
    for _ in 0..100 {
        if store.len() == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }

    let optimistic = &store.snapshot()[0];
    assert!(optimistic.has_temp_id());
    assert_eq!(optimistic.status, ReadStatus::Unread);
    assert_eq!(optimistic.priority, 0);
    assert!(optimistic.tags.is_empty());

    gate.notify_one();
    let created = task.await.unwrap().unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.snapshot()[0].id, created.id);
}

#[tokio::test]
async fn test_failed_create_rolls_back_to_the_exact_pre_call_snapshot() {
    let (store, backend, coordinator) =
        setup(vec![record("srv-1", ReadStatus::Unread, 10)]).await;
    let before: Vec<String> = store.snapshot().into_iter().map(|b| b.id).collect();

    backend.set_fail_writes(true);
    let err = coordinator
        .add_bookmark(OWNER, "https://example.com", Some("Ex"), None)
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Failed to add bookmark:"));
    let after: Vec<String> = store.snapshot().into_iter().map(|b| b.id).collect();
    assert_eq!(after, before, "same length, same ids as before the call");
}

#[tokio::test]
async fn test_edit_bookmark_unknown_id_is_not_found() {
    let (_, backend, coordinator) = setup(Vec::new()).await;
    let err = coordinator
        .edit_bookmark(
            OWNER,
            "missing",
            BookmarkPatch {
                title: Some("x".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, BookmarkError::NotFound("missing".to_string()));
    assert_eq!(backend.update_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_edit_bookmark_rejects_invalid_replacement_url() {
    let (store, backend, coordinator) =
        setup(vec![record("srv-1", ReadStatus::Unread, 10)]).await;

    let err = coordinator
        .edit_bookmark(
            OWNER,
            "srv-1",
            BookmarkPatch {
                url: Some("ftp://x.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BookmarkError::InvalidUrl(_)));
    assert_eq!(store.get("srv-1").unwrap().url, "https://example.com/srv-1");
    assert_eq!(backend.update_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_change_status_stamps_and_clears_completed_at() {
    let (store, _, coordinator) =
        setup(vec![record("srv-1", ReadStatus::Unread, 10)]).await;

    coordinator
        .change_status(OWNER, "srv-1", ReadStatus::Completed)
        .await
        .unwrap();
    assert!(store.get("srv-1").unwrap().completed_at.is_some());

    coordinator
        .change_status(OWNER, "srv-1", ReadStatus::Reading)
        .await
        .unwrap();
    let reading = store.get("srv-1").unwrap();
    assert_eq!(reading.status, ReadStatus::Reading);
    assert_eq!(reading.completed_at, None);
}

#[tokio::test]
async fn test_failed_status_change_reloads_authoritative_state() {
    let (store, backend, coordinator) =
        setup(vec![record("srv-1", ReadStatus::Unread, 10)]).await;

    backend.set_fail_writes(true);
    let err = coordinator
        .change_status(OWNER, "srv-1", ReadStatus::Completed)
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Failed to change status:"));
    let rolled_back = store.get("srv-1").unwrap();
    assert_eq!(rolled_back.status, ReadStatus::Unread);
    assert_eq!(rolled_back.completed_at, None);
}

#[tokio::test]
async fn test_toggle_priority_flips_between_zero_and_one() {
    let (store, _, coordinator) =
        setup(vec![record("srv-1", ReadStatus::Unread, 10)]).await;

    coordinator.toggle_priority(OWNER, "srv-1").await.unwrap();
    assert_eq!(store.get("srv-1").unwrap().priority, 1);

    coordinator.toggle_priority(OWNER, "srv-1").await.unwrap();
    assert_eq!(store.get("srv-1").unwrap().priority, 0);
}

#[tokio::test]
async fn test_add_duplicate_tag_is_a_local_no_op() {
    let mut seeded = record("srv-1", ReadStatus::Unread, 10);
    seeded.tags = vec!["js".to_string()];
    let (store, backend, coordinator) = setup(vec![seeded]).await;

    let unchanged = coordinator.add_tag(OWNER, "srv-1", "js").await.unwrap();

    assert_eq!(unchanged.tags, vec!["js"]);
    assert_eq!(store.get("srv-1").unwrap().tags, vec!["js"]);
    assert_eq!(
        backend.update_calls.load(Ordering::SeqCst),
        0,
        "duplicate tag must not reach the backend"
    );
}

#[tokio::test]
async fn test_add_new_tag_updates_store_and_backend() {
    let mut seeded = record("srv-1", ReadStatus::Unread, 10);
    seeded.tags = vec!["js".to_string()];
    let (store, backend, coordinator) = setup(vec![seeded]).await;

    let updated = coordinator.add_tag(OWNER, "srv-1", "rust").await.unwrap();

    assert_eq!(updated.tags, vec!["js", "rust"]);
    assert_eq!(store.get("srv-1").unwrap().tags, vec!["js", "rust"]);
    assert_eq!(backend.update_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_add_empty_tag_is_a_validation_error() {
    let (_, backend, coordinator) =
        setup(vec![record("srv-1", ReadStatus::Unread, 10)]).await;
    let err = coordinator.add_tag(OWNER, "srv-1", "").await.unwrap_err();
    assert_eq!(err, BookmarkError::EmptyField("tag"));
    assert_eq!(backend.update_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remove_absent_tag_is_a_no_op_success() {
    let (_, backend, coordinator) =
        setup(vec![record("srv-1", ReadStatus::Unread, 10)]).await;

    let unchanged = coordinator
        .remove_tag(OWNER, "srv-1", "ghost")
        .await
        .unwrap();

    assert!(unchanged.tags.is_empty());
    assert_eq!(backend.update_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remove_existing_tag() {
    let mut seeded = record("srv-1", ReadStatus::Unread, 10);
    seeded.tags = vec!["js".to_string(), "rust".to_string()];
    let (store, _, coordinator) = setup(vec![seeded]).await;

    coordinator.remove_tag(OWNER, "srv-1", "js").await.unwrap();
    assert_eq!(store.get("srv-1").unwrap().tags, vec!["rust"]);
}

#[tokio::test]
async fn test_mark_all_read_targets_unread_and_reading_with_one_timestamp() {
    let (store, _, coordinator) = setup(vec![
        record("srv-1", ReadStatus::Unread, 10),
        record("srv-2", ReadStatus::Reading, 20),
        record("srv-3", ReadStatus::Completed, 30),
    ])
    .await;

    let affected = coordinator.mark_all_read(OWNER).await.unwrap();
    assert_eq!(affected, 2);

    let first = store.get("srv-1").unwrap();
    let second = store.get("srv-2").unwrap();
    let third = store.get("srv-3").unwrap();
    assert_eq!(first.status, ReadStatus::Completed);
    assert_eq!(second.status, ReadStatus::Completed);
    assert_eq!(
        first.completed_at, second.completed_at,
        "one timestamp for the whole bulk transition"
    );
    assert_eq!(third.completed_at, Some(30), "already-completed untouched");
}

#[tokio::test]
async fn test_mark_all_read_with_nothing_to_do_skips_the_backend() {
    let (_, backend, coordinator) =
        setup(vec![record("srv-1", ReadStatus::Completed, 10)]).await;
    let affected = coordinator.mark_all_read(OWNER).await.unwrap();
    assert_eq!(affected, 0);
    assert_eq!(backend.update_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_clear_completed_removes_only_completed() {
    let (store, _, coordinator) = setup(vec![
        record("srv-1", ReadStatus::Unread, 10),
        record("srv-2", ReadStatus::Completed, 20),
        record("srv-3", ReadStatus::Completed, 30),
    ])
    .await;

    let cleared = coordinator.clear_completed(OWNER).await.unwrap();
    assert_eq!(cleared, 2);
    assert_eq!(store.len(), 1);
    assert!(store.get("srv-1").is_some());
}

#[tokio::test]
async fn test_clear_completed_on_empty_set_skips_the_backend() {
    let (_, backend, coordinator) =
        setup(vec![record("srv-1", ReadStatus::Unread, 10)]).await;
    let cleared = coordinator.clear_completed(OWNER).await.unwrap();
    assert_eq!(cleared, 0);
    assert_eq!(backend.delete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remove_bookmark_and_remove_multiple() {
    let (store, backend, coordinator) = setup(vec![
        record("srv-1", ReadStatus::Unread, 10),
        record("srv-2", ReadStatus::Unread, 20),
        record("srv-3", ReadStatus::Unread, 30),
    ])
    .await;

    coordinator.remove_bookmark(OWNER, "srv-2").await.unwrap();
    assert!(store.get("srv-2").is_none());

    let err = coordinator
        .remove_bookmark(OWNER, "srv-2")
        .await
        .unwrap_err();
    assert_eq!(err, BookmarkError::NotFound("srv-2".to_string()));

    coordinator
        .remove_multiple(OWNER, &["srv-1".to_string(), "srv-3".to_string()])
        .await
        .unwrap();
    assert!(store.is_empty());
    assert_eq!(backend.delete_calls.load(Ordering::SeqCst), 2);
}
