//! Filtering and ordering of lists.
use crate::record::{Link, Note};
use chrono::NaiveDateTime;

/// A note search, matched case-insensitively against title and content.
///
/// An empty (or all-whitespace) search matches every note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    full_text: String,
}

impl SearchRequest {
    pub fn all() -> Self {
        Default::default()
    }

    pub fn is_empty(&self) -> bool {
        self.full_text.is_empty()
    }

    pub fn matches(&self, note: &Note) -> bool {
        self.is_empty() || note.matches(&self.full_text)
    }
}

impl From<String> for SearchRequest {
    fn from(query: String) -> SearchRequest {
        SearchRequest::from(query.as_str())
    }
}

impl From<&str> for SearchRequest {
    fn from(query: &str) -> SearchRequest {
        SearchRequest {
            full_text: query.trim().to_lowercase(),
        }
    }
}

impl From<Option<&str>> for SearchRequest {
    fn from(query: Option<&str>) -> SearchRequest {
        query.map(SearchRequest::from).unwrap_or_default()
    }
}

/// Filter notes by `search` and order them for display at `now`.
///
/// Notes with a past-due reminder come first, then all others.
/// Within each group, the most recently updated note comes first.
pub fn filter_and_sort_notes(
    notes: Vec<Note>,
    search: &SearchRequest,
    now: NaiveDateTime,
) -> Vec<Note> {
    let mut notes: Vec<Note> = notes.into_iter().filter(|n| search.matches(n)).collect();
    // Stable, so equal timestamps keep the backend's order
    notes.sort_by(|a, b| {
        b.is_past_due(now)
            .cmp(&a.is_past_due(now))
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });
    notes
}

/// Order links newest first.
pub fn sort_links(mut links: Vec<Link>) -> Vec<Link> {
    links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    links
}
