//! Live Update Listener for readlist.
//!
//! Keeps the local snapshot consistent with changes made outside this client
//! session (other devices or tabs) by draining the per-owner change feed and
//! reconciling each event into the record store. Event application is
//! idempotent so the listener and an in-flight optimistic reconciliation can
//! race without creating duplicates.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::managers::record_store::{RecordStore, RecordStoreTrait};
use crate::services::persistence::ChangeFeed;
use crate::types::change::{ChangeEvent, ChangeKind};

/// Reconciles one change-feed event into the store.
///
/// - Insert: skipped when the id already exists (the echo of this session's
///   own confirmed creation racing the push channel).
/// - Update: unknown ids are inserted instead, self-healing local drift.
/// - Delete: removing an already-absent id is a no-op.
pub fn apply_event(store: &RecordStore, event: ChangeEvent) {
    tracing::debug!(kind = ?event.kind, id = %event.record.id, "live update received");
    match event.kind {
        ChangeKind::Insert => store.insert(event.record),
        ChangeKind::Update => store.upsert(event.record),
        ChangeKind::Delete => store.remove(&event.record.id),
    }
}

/// Owns the subscription task for one user session.
pub struct LiveUpdateListener {
    store: Arc<RecordStore>,
    task: Option<JoinHandle<()>>,
}

impl LiveUpdateListener {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store, task: None }
    }

    /// Subscribes to the owner's change feed and starts applying events.
    /// Starting while already subscribed tears the old subscription down
    /// first.
    pub fn start(&mut self, feed: &dyn ChangeFeed, owner: &str) {
        self.stop();
        let mut events = feed.subscribe(owner);
        let store = Arc::clone(&self.store);
        self.task = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                apply_event(store.as_ref(), event);
            }
        }));
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Tears down the subscription. Idempotent: safe to call when the
    /// subscription was never established or is already closed.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LiveUpdateListener {
    fn drop(&mut self) {
        self.stop();
    }
}
