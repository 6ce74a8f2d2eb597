use serde::{Deserialize, Serialize};

/// Reading status of a bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStatus {
    Unread,
    Reading,
    Completed,
}

impl ReadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadStatus::Unread => "unread",
            ReadStatus::Reading => "reading",
            ReadStatus::Completed => "completed",
        }
    }
}

/// Represents a saved bookmark in a user's reading list.
///
/// Temporary client-generated ids carry the `temp-` prefix until the server
/// confirms the record; server ids never use that prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bookmark {
    pub id: String,
    pub owner: String,
    pub url: String,
    pub title: String,
    pub favicon_url: Option<String>,
    pub notes: Option<String>,
    pub status: ReadStatus,
    /// Unix ms; present exactly when `status` is `Completed`.
    pub completed_at: Option<i64>,
    /// 0 or 1; 1 = pinned.
    pub priority: u8,
    pub tags: Vec<String>,
    /// Unix ms; immutable once set.
    pub created_at: i64,
}

impl Bookmark {
    /// Prefix used for client-generated ids awaiting server confirmation.
    pub const TEMP_ID_PREFIX: &'static str = "temp-";

    pub fn is_pinned(&self) -> bool {
        self.priority == 1
    }

    pub fn has_temp_id(&self) -> bool {
        self.id.starts_with(Self::TEMP_ID_PREFIX)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Sets the status and keeps `completed_at` consistent with it:
    /// transitioning to `Completed` stamps `now`, leaving it clears the stamp.
    pub fn set_status(&mut self, status: ReadStatus, now: i64) {
        self.status = status;
        self.completed_at = match status {
            ReadStatus::Completed => Some(self.completed_at.unwrap_or(now)),
            _ => None,
        };
    }

    /// Restores the record invariants after arbitrary field changes:
    /// no duplicate or empty tags, priority clamped to {0, 1}, and
    /// `completed_at` present exactly when the status is `Completed`.
    pub fn normalize(&mut self, now: i64) {
        let mut seen: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags.drain(..) {
            if !tag.is_empty() && !seen.contains(&tag) {
                seen.push(tag);
            }
        }
        self.tags = seen;

        if self.priority != 1 {
            self.priority = 0;
        }

        self.completed_at = match self.status {
            ReadStatus::Completed => Some(self.completed_at.unwrap_or(now)),
            _ => None,
        };
    }
}

/// Field set sent to the backend when creating a bookmark.
/// The server assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewBookmark {
    pub owner: String,
    pub url: String,
    pub title: String,
    pub favicon_url: Option<String>,
    pub notes: Option<String>,
    pub status: ReadStatus,
    pub priority: u8,
    pub tags: Vec<String>,
}

/// Explicit partial update for a bookmark. Absent fields are left untouched;
/// fields the schema does not define are rejected rather than merged.
///
/// `favicon_url`, `notes` and `completed_at` are doubly optional so a patch
/// can distinguish "leave as is" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookmarkPatch {
    pub url: Option<String>,
    pub title: Option<String>,
    pub favicon_url: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub status: Option<ReadStatus>,
    pub completed_at: Option<Option<i64>>,
    pub priority: Option<u8>,
    pub tags: Option<Vec<String>>,
}

impl BookmarkPatch {
    pub fn is_empty(&self) -> bool {
        *self == BookmarkPatch::default()
    }

    /// Patch that moves a record to `status`, stamping or clearing
    /// `completed_at` as the transition requires.
    pub fn status_change(status: ReadStatus, now: i64) -> Self {
        BookmarkPatch {
            status: Some(status),
            completed_at: Some(match status {
                ReadStatus::Completed => Some(now),
                _ => None,
            }),
            ..Default::default()
        }
    }

    /// Applies this patch to a record. The record is re-normalized afterwards
    /// so a patch can never leave the status/completed_at pair inconsistent.
    pub fn apply_to(&self, record: &mut Bookmark, now: i64) {
        if let Some(url) = &self.url {
            record.url = url.clone();
        }
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(favicon_url) = &self.favicon_url {
            record.favicon_url = favicon_url.clone();
        }
        if let Some(notes) = &self.notes {
            record.notes = notes.clone();
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(completed_at) = self.completed_at {
            record.completed_at = completed_at;
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
        record.normalize(now);
    }
}
