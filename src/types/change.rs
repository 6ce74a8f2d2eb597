use serde::{Deserialize, Serialize};

use crate::types::bookmark::Bookmark;

/// Kind of change delivered by the per-owner change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A push notification for a single record owned by the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub record: Bookmark,
}

impl ChangeEvent {
    pub fn insert(record: Bookmark) -> Self {
        ChangeEvent { kind: ChangeKind::Insert, record }
    }

    pub fn update(record: Bookmark) -> Self {
        ChangeEvent { kind: ChangeKind::Update, record }
    }

    pub fn delete(record: Bookmark) -> Self {
        ChangeEvent { kind: ChangeKind::Delete, record }
    }
}
