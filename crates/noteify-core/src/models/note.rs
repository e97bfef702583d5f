//! Note model and the create/update payloads sent to the notes API

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Title given to notes created from the "new note" action.
pub const UNTITLED_NOTE_TITLE: &str = "Untitled Note";

/// Identifier rejected because it was empty after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("note identifier must not be empty")]
pub struct InvalidNoteId;

/// A note identifier assigned by the remote collection.
///
/// Always non-empty: notes that have not round-tripped through `create`
/// are represented by [`NewNote`] and have no identifier at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteId(String);

impl NoteId {
    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = InvalidNoteId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidNoteId);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for NoteId {
    type Error = InvalidNoteId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NoteId> for String {
    fn from(value: NoteId) -> Self {
        value.0
    }
}

/// A note as confirmed by the remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Remote-assigned identifier
    #[serde(rename = "_id")]
    pub id: NoteId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Ordered, duplicates permitted
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, rename = "isPinned")]
    pub pinned: bool,
    #[serde(default, rename = "isArchived")]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_date: Option<DateTime<Utc>>,
}

impl Note {
    /// Whether title, content and tags are equal by value.
    ///
    /// These are the fields an edit session can change.
    #[must_use]
    pub fn same_editable_fields(&self, other: &Self) -> bool {
        self.title == other.title && self.content == other.content && self.tags == other.tags
    }

    /// Check if the note has any tag contained in `selected`.
    ///
    /// Surrounding whitespace is ignored on both sides; blank tags never match.
    #[must_use]
    pub fn has_any_tag<'a>(&self, mut selected: impl Iterator<Item = &'a String>) -> bool {
        selected.any(|wanted| {
            let wanted = wanted.trim();
            !wanted.is_empty() && self.tags.iter().any(|tag| tag.trim() == wanted)
        })
    }
}

/// Payload for creating a note. Carries no identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(rename = "isPinned")]
    pub pinned: bool,
    #[serde(rename = "isArchived")]
    pub archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_date: Option<DateTime<Utc>>,
}

impl NewNote {
    /// Create a payload with the given title and content and no tags
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// The blank note created by the "new note" action
    #[must_use]
    pub fn untitled() -> Self {
        Self::new(UNTITLED_NOTE_TITLE, "")
    }

    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial update payload. Absent fields are left untouched remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "isPinned", skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(rename = "isArchived", skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_date: Option<DateTime<Utc>>,
}

impl NotePatch {
    /// Patch carrying the editable fields (title, content, tags) of a draft
    #[must_use]
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: Some(note.title.clone()),
            content: Some(note.content.clone()),
            tags: Some(note.tags.clone()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Whether the patch would change nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.pinned.is_none()
            && self.archived.is_none()
            && self.reminder_date.is_none()
    }

    /// Apply the patch to a local copy of a note
    pub fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title.clone_from(title);
        }
        if let Some(content) = &self.content {
            note.content.clone_from(content);
        }
        if let Some(tags) = &self.tags {
            note.tags.clone_from(tags);
        }
        if let Some(pinned) = self.pinned {
            note.pinned = pinned;
        }
        if let Some(archived) = self.archived {
            note.archived = archived;
        }
        if let Some(reminder_date) = self.reminder_date {
            note.reminder_date = Some(reminder_date);
        }
    }
}
