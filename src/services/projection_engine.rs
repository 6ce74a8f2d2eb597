//! readlist View Projection Engine.
//!
//! Derives the presented list and aggregates from a record snapshot. This is
//! a pure function of (snapshot, query): the caller re-invokes it whenever
//! the record store notifies a change.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::bookmark::{Bookmark, ReadStatus};

/// Status filter applied to the visible list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ReadStatus),
}

/// Secondary sort key. Pinned records always sort first regardless of the
/// chosen key; the key orders records within the pinned and unpinned groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedDesc,
    CreatedAsc,
    TitleAsc,
    TitleDesc,
    PriorityOnly,
}

/// Filter and sort parameters for a projection.
#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    /// Case-insensitive substring matched against title, url and notes.
    pub search: String,
    pub status: StatusFilter,
    /// A record passes when its tag set intersects this selection;
    /// an empty selection skips the tag filter.
    pub tags: Vec<String>,
    pub sort: SortKey,
}

/// Record counts per status over the full snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub all: usize,
    pub unread: usize,
    pub reading: usize,
    pub completed: usize,
}

/// Number of records carrying a tag, over the full snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// A derived view: the filtered/sorted list plus aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedView {
    pub visible: Vec<Bookmark>,
    pub status_counts: StatusCounts,
    /// Sorted by count descending; ties keep first-encountered order.
    pub tag_counts: Vec<TagCount>,
}

fn matches_search(record: &Bookmark, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    record.title.to_lowercase().contains(needle)
        || record.url.to_lowercase().contains(needle)
        || record
            .notes
            .as_ref()
            .is_some_and(|notes| notes.to_lowercase().contains(needle))
}

fn matches_status(record: &Bookmark, filter: StatusFilter) -> bool {
    match filter {
        StatusFilter::All => true,
        StatusFilter::Only(status) => record.status == status,
    }
}

fn matches_tags(record: &Bookmark, selected: &[String]) -> bool {
    selected.is_empty() || selected.iter().any(|tag| record.has_tag(tag))
}

// Pinned-first rank: 0 sorts before 1.
fn pin_rank(record: &Bookmark) -> u8 {
    if record.is_pinned() {
        0
    } else {
        1
    }
}

fn compare(a: &Bookmark, b: &Bookmark, key: SortKey) -> Ordering {
    pin_rank(a).cmp(&pin_rank(b)).then_with(|| match key {
        SortKey::CreatedDesc => b.created_at.cmp(&a.created_at),
        SortKey::CreatedAsc => a.created_at.cmp(&b.created_at),
        SortKey::TitleAsc => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortKey::TitleDesc => b.title.to_lowercase().cmp(&a.title.to_lowercase()),
        SortKey::PriorityOnly => Ordering::Equal,
    })
}

fn count_statuses(snapshot: &[Bookmark]) -> StatusCounts {
    let mut counts = StatusCounts {
        all: snapshot.len(),
        ..Default::default()
    };
    for record in snapshot {
        match record.status {
            ReadStatus::Unread => counts.unread += 1,
            ReadStatus::Reading => counts.reading += 1,
            ReadStatus::Completed => counts.completed += 1,
        }
    }
    counts
}

fn count_tags(snapshot: &[Bookmark]) -> Vec<TagCount> {
    let mut counts: Vec<TagCount> = Vec::new();
    for record in snapshot {
        for tag in &record.tags {
            match counts.iter_mut().find(|c| c.tag == *tag) {
                Some(entry) => entry.count += 1,
                None => counts.push(TagCount {
                    tag: tag.clone(),
                    count: 1,
                }),
            }
        }
    }
    // Stable sort keeps first-encountered order for equal counts.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Projects a snapshot into a view. Filters are AND-combined: search, then
/// status, then tag selection. Aggregates are computed over the full
/// snapshot, not the filtered list.
pub fn project(snapshot: &[Bookmark], query: &ViewQuery) -> ProjectedView {
    let needle = query.search.to_lowercase();

    let mut visible: Vec<Bookmark> = snapshot
        .iter()
        .filter(|record| {
            matches_search(record, &needle)
                && matches_status(record, query.status)
                && matches_tags(record, &query.tags)
        })
        .cloned()
        .collect();
    visible.sort_by(|a, b| compare(a, b, query.sort));

    ProjectedView {
        visible,
        status_counts: count_statuses(snapshot),
        tag_counts: count_tags(snapshot),
    }
}
