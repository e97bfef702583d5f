//! Note list filtering (search + tag filtering).
//!
//! Everything here is a pure function of its inputs so the store can
//! recompute the visible list on every change and compare it with the
//! previous one.

use std::collections::BTreeSet;

use crate::models::Note;

/// Inputs of the visible-notes derivation besides the notes themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Case-insensitive substring matched against title or content
    pub search_query: String,
    /// Empty means no tag filter
    pub selected_tags: BTreeSet<String>,
}

impl FilterState {
    #[must_use]
    pub fn new(
        search_query: impl Into<String>,
        selected_tags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            search_query: search_query.into(),
            selected_tags: selected_tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Select `tag` when absent, deselect it when present.
    pub fn toggle_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.selected_tags.remove(&tag) {
            self.selected_tags.insert(tag);
        }
    }

    /// Whether any filter is narrowing the list
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.search_query.is_empty() || !self.selected_tags.is_empty()
    }

    #[must_use]
    pub fn matches(&self, note: &Note) -> bool {
        note_matches_query(note, &self.search_query.to_lowercase())
            && note_matches_tags(note, &self.selected_tags)
    }
}

/// Notes matching the search query and sharing at least one selected tag,
/// in their original order.
#[must_use]
pub fn visible_notes(notes: &[Note], filter: &FilterState) -> Vec<Note> {
    let query = filter.search_query.to_lowercase();
    notes
        .iter()
        .filter(|note| note_matches_query(note, &query))
        .filter(|note| note_matches_tags(note, &filter.selected_tags))
        .cloned()
        .collect()
}

/// Return a sorted, deduplicated list of the non-empty tags across notes.
#[must_use]
pub fn available_tags(notes: &[Note]) -> Vec<String> {
    let mut tags = BTreeSet::new();
    for note in notes {
        for tag in &note.tags {
            let tag = tag.trim();
            if !tag.is_empty() {
                tags.insert(tag.to_string());
            }
        }
    }
    tags.into_iter().collect()
}

fn note_matches_query(note: &Note, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    note.title.to_lowercase().contains(query) || note.content.to_lowercase().contains(query)
}

fn note_matches_tags(note: &Note, selected: &BTreeSet<String>) -> bool {
    selected.is_empty() || note.has_any_tag(selected.iter())
}
