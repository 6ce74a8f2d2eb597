//! Collaborator contracts consumed by the bookmark state engine.
//!
//! The persistence service and change feed are implemented elsewhere (the
//! backend client); the engine only depends on these traits, which also keeps
//! the coordinator and listener testable against in-memory fakes.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::types::bookmark::{Bookmark, BookmarkPatch, NewBookmark};
use crate::types::change::ChangeEvent;
use crate::types::errors::BackendError;

/// Backend of record for bookmark collections.
///
/// Every operation fails with the uniform [`BackendError`]; the coordinator
/// treats transport and authorization failures the same way.
#[async_trait]
pub trait PersistenceService: Send + Sync {
    /// Fetches the full collection for the given owner.
    async fn fetch_all(&self, owner: &str) -> Result<Vec<Bookmark>, BackendError>;

    /// Creates a bookmark. The server assigns `id` and `created_at`.
    async fn create(&self, fields: NewBookmark) -> Result<Bookmark, BackendError>;

    /// Applies a partial update and returns the authoritative record.
    async fn update(&self, id: &str, patch: BookmarkPatch) -> Result<Bookmark, BackendError>;

    /// Deletes a bookmark by id.
    async fn delete(&self, id: &str) -> Result<(), BackendError>;

    /// Deletes every bookmark whose id appears in `ids`.
    async fn delete_many(&self, ids: &[String]) -> Result<(), BackendError>;
}

/// Per-owner push channel delivering insert/update/delete notifications for
/// changes made outside this client session. Unsubscription is dropping the
/// receiver (and the task draining it).
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, owner: &str) -> UnboundedReceiver<ChangeEvent>;
}
