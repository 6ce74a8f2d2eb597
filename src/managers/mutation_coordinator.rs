//! Optimistic Mutation Coordinator for readlist.
//!
//! Wraps every user-initiated change in an optimistic-apply / commit /
//! rollback protocol against the record store: the local effect is applied
//! immediately, the backend request runs asynchronously, and a failure rolls
//! back by reloading the authoritative collection (never by computing an
//! inverse operation). Validation and not-found errors are raised before any
//! store mutation and therefore never trigger a rollback.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::managers::record_store::{RecordStore, RecordStoreTrait};
use crate::services::metadata;
use crate::services::persistence::PersistenceService;
use crate::types::bookmark::{Bookmark, BookmarkPatch, NewBookmark, ReadStatus};
use crate::types::errors::{BackendError, BookmarkError};

/// Coordinates optimistic mutations between the record store and the
/// persistence service. All operations are scoped to an explicit `owner`.
pub struct MutationCoordinator {
    store: Arc<RecordStore>,
    backend: Arc<dyn PersistenceService>,
}

impl MutationCoordinator {
    pub fn new(store: Arc<RecordStore>, backend: Arc<dyn PersistenceService>) -> Self {
        Self { store, backend }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    /// Client-generated id for a record awaiting server confirmation.
    /// Monotonic clock plus random suffix; never collides with server ids
    /// thanks to the namespace prefix.
    fn temp_id() -> String {
        format!(
            "{}{}-{}",
            Bookmark::TEMP_ID_PREFIX,
            Self::now_ms(),
            Uuid::new_v4().simple()
        )
    }

    fn validate_url(url: &str) -> Result<(), BookmarkError> {
        if url.is_empty() {
            return Err(BookmarkError::EmptyField("url"));
        }
        if !metadata::is_valid_url(url) {
            return Err(BookmarkError::InvalidUrl(url.to_string()));
        }
        Ok(())
    }

    fn require(&self, id: &str) -> Result<Bookmark, BookmarkError> {
        self.store
            .get(id)
            .ok_or_else(|| BookmarkError::NotFound(id.to_string()))
    }

    /// Rollback path: discard local state by refetching the authoritative
    /// collection, then surface the failure. Reloading also self-heals any
    /// accumulated client/server drift.
    async fn rollback(
        &self,
        owner: &str,
        action: &'static str,
        err: BackendError,
    ) -> BookmarkError {
        tracing::warn!(%owner, action, error = %err, "backend call failed, reloading collection");
        if let Err(reload_err) = self.store.load(self.backend.as_ref(), owner).await {
            tracing::warn!(%owner, error = %reload_err, "rollback reload failed");
        }
        BookmarkError::OperationFailed {
            action,
            message: err.0,
        }
    }

    /// Fetches the authoritative collection and swaps it in.
    /// Returns the record count.
    pub async fn reload(&self, owner: &str) -> Result<usize, BookmarkError> {
        self.store.load(self.backend.as_ref(), owner).await
    }

    /// Creates a bookmark. When no custom title is given, the title defaults
    /// to the URL's domain. The optimistic record (status unread, priority 0,
    /// no tags) is visible immediately under a temporary id, which the server
    /// confirmation replaces atomically.
    pub async fn add_bookmark(
        &self,
        owner: &str,
        url: &str,
        title: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Bookmark, BookmarkError> {
        Self::validate_url(url)?;
        if let Some(title) = title {
            if title.is_empty() {
                return Err(BookmarkError::EmptyField("title"));
            }
        }

        let derived = metadata::fetch_metadata(url);
        let title = title.map(str::to_string).unwrap_or(derived.title);

        let optimistic = Bookmark {
            id: Self::temp_id(),
            owner: owner.to_string(),
            url: url.to_string(),
            title: title.clone(),
            favicon_url: derived.favicon_url.clone(),
            notes: notes.map(str::to_string),
            status: ReadStatus::Unread,
            completed_at: None,
            priority: 0,
            tags: Vec::new(),
            created_at: Self::now_ms(),
        };
        let temp_id = optimistic.id.clone();
        self.store.insert(optimistic);

        let fields = NewBookmark {
            owner: owner.to_string(),
            url: url.to_string(),
            title,
            favicon_url: derived.favicon_url,
            notes: notes.map(str::to_string),
            status: ReadStatus::Unread,
            priority: 0,
            tags: Vec::new(),
        };
        match self.backend.create(fields).await {
            Ok(confirmed) => {
                self.store.reconcile(&temp_id, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => Err(self.rollback(owner, "add bookmark", e).await),
        }
    }

    /// Applies a partial edit. The server response becomes the authoritative
    /// record on success.
    pub async fn edit_bookmark(
        &self,
        owner: &str,
        id: &str,
        patch: BookmarkPatch,
    ) -> Result<Bookmark, BookmarkError> {
        self.require(id)?;
        if let Some(url) = &patch.url {
            Self::validate_url(url)?;
        }
        if let Some(title) = &patch.title {
            if title.is_empty() {
                return Err(BookmarkError::EmptyField("title"));
            }
        }

        self.store.patch(id, &patch);
        match self.backend.update(id, patch).await {
            Ok(confirmed) => {
                self.store.reconcile(id, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => Err(self.rollback(owner, "update bookmark", e).await),
        }
    }

    pub async fn remove_bookmark(&self, owner: &str, id: &str) -> Result<(), BookmarkError> {
        self.require(id)?;
        self.store.remove(id);
        match self.backend.delete(id).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.rollback(owner, "delete bookmark", e).await),
        }
    }

    /// Removes several bookmarks in one backend call. Ids absent from the
    /// local snapshot are passed through; the backend treats them as already
    /// deleted.
    pub async fn remove_multiple(
        &self,
        owner: &str,
        ids: &[String],
    ) -> Result<(), BookmarkError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.store.remove_many(ids);
        match self.backend.delete_many(ids).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.rollback(owner, "delete bookmarks", e).await),
        }
    }

    /// Moves a bookmark to `status`. Transitioning to completed stamps
    /// `completed_at`; transitioning away clears it.
    pub async fn change_status(
        &self,
        owner: &str,
        id: &str,
        status: ReadStatus,
    ) -> Result<Bookmark, BookmarkError> {
        self.require(id)?;
        let patch = BookmarkPatch::status_change(status, Self::now_ms());
        self.store.patch(id, &patch);
        match self.backend.update(id, patch).await {
            Ok(confirmed) => {
                self.store.reconcile(id, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => Err(self.rollback(owner, "change status", e).await),
        }
    }

    /// Flips priority strictly between 0 and 1; any other stored value is
    /// treated as 0 (and so toggles to 1).
    pub async fn toggle_priority(
        &self,
        owner: &str,
        id: &str,
    ) -> Result<Bookmark, BookmarkError> {
        let current = self.require(id)?;
        let next = if current.priority == 1 { 0 } else { 1 };
        let patch = BookmarkPatch {
            priority: Some(next),
            ..Default::default()
        };
        self.store.patch(id, &patch);
        match self.backend.update(id, patch).await {
            Ok(confirmed) => {
                self.store.reconcile(id, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => Err(self.rollback(owner, "toggle priority", e).await),
        }
    }

    /// Adds a tag. Idempotent: if the record already carries the tag
    /// (exact, case-sensitive match) the current record is returned and no
    /// backend request is made.
    pub async fn add_tag(
        &self,
        owner: &str,
        id: &str,
        tag: &str,
    ) -> Result<Bookmark, BookmarkError> {
        if tag.is_empty() {
            return Err(BookmarkError::EmptyField("tag"));
        }
        let current = self.require(id)?;
        if current.has_tag(tag) {
            return Ok(current);
        }

        let mut tags = current.tags;
        tags.push(tag.to_string());
        let patch = BookmarkPatch {
            tags: Some(tags),
            ..Default::default()
        };
        self.store.patch(id, &patch);
        match self.backend.update(id, patch).await {
            Ok(confirmed) => {
                self.store.reconcile(id, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => Err(self.rollback(owner, "add tag", e).await),
        }
    }

    /// Removes a tag. Removing a tag the record does not carry is a no-op
    /// success with no backend request.
    pub async fn remove_tag(
        &self,
        owner: &str,
        id: &str,
        tag: &str,
    ) -> Result<Bookmark, BookmarkError> {
        let current = self.require(id)?;
        if !current.has_tag(tag) {
            return Ok(current);
        }

        let tags: Vec<String> = current.tags.into_iter().filter(|t| t != tag).collect();
        let patch = BookmarkPatch {
            tags: Some(tags),
            ..Default::default()
        };
        self.store.patch(id, &patch);
        match self.backend.update(id, patch).await {
            Ok(confirmed) => {
                self.store.reconcile(id, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => Err(self.rollback(owner, "remove tag", e).await),
        }
    }

    /// Marks every unread or reading bookmark completed, all with the same
    /// `completed_at` timestamp. The affected set is computed up front so the
    /// returned count matches exactly what changed; an empty set contacts
    /// neither the store nor the backend.
    pub async fn mark_all_read(&self, owner: &str) -> Result<usize, BookmarkError> {
        let affected: Vec<String> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|b| b.status != ReadStatus::Completed)
            .map(|b| b.id)
            .collect();
        if affected.is_empty() {
            return Ok(0);
        }

        let patch = BookmarkPatch::status_change(ReadStatus::Completed, Self::now_ms());
        for id in &affected {
            self.store.patch(id, &patch);
        }
        for id in &affected {
            match self.backend.update(id, patch.clone()).await {
                Ok(confirmed) => self.store.reconcile(id, confirmed),
                Err(e) => return Err(self.rollback(owner, "mark all as read", e).await),
            }
        }
        Ok(affected.len())
    }

    /// Deletes every completed bookmark. An empty set is a no-op that does
    /// not contact the backend.
    pub async fn clear_completed(&self, owner: &str) -> Result<usize, BookmarkError> {
        let completed: Vec<String> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|b| b.status == ReadStatus::Completed)
            .map(|b| b.id)
            .collect();
        if completed.is_empty() {
            return Ok(0);
        }

        self.store.remove_many(&completed);
        match self.backend.delete_many(&completed).await {
            Ok(()) => Ok(completed.len()),
            Err(e) => Err(self.rollback(owner, "clear completed", e).await),
        }
    }
}
