//! Edit session for the open note.
//!
//! `EditSession` owns the draft copy of the note being edited. Every field
//! change is applied to the draft and the full draft is handed to the
//! [`AutosavePipeline`]; the store only changes once the remote confirms a
//! save. A failed save leaves the draft as it is.

use chrono::{DateTime, Utc};

use crate::autosave::AutosavePipeline;
use crate::error::{Error, Result};
use crate::models::{Note, NoteId};
use crate::remote::NotesApi;
use crate::store::StoreSnapshot;

pub struct EditSession<A> {
    pipeline: AutosavePipeline<A>,
    draft: Option<Note>,
    dirty_since: Option<DateTime<Utc>>,
}

impl<A: NotesApi + 'static> EditSession<A> {
    pub const fn new(pipeline: AutosavePipeline<A>) -> Self {
        Self {
            pipeline,
            draft: None,
            dirty_since: None,
        }
    }

    pub const fn pipeline(&self) -> &AutosavePipeline<A> {
        &self.pipeline
    }

    /// The draft being edited, if a note is open
    pub const fn draft(&self) -> Option<&Note> {
        self.draft.as_ref()
    }

    /// When the most recent change not yet confirmed by the store was made
    pub const fn dirty_since(&self) -> Option<DateTime<Utc>> {
        self.dirty_since
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// Open `note` for editing, or close the session with `None`.
    ///
    /// Re-selecting the open note keeps its draft. Switching away settles the
    /// previous note's pending autosave.
    pub fn select(&mut self, note: Option<Note>) {
        let same_note = match (&self.draft, &note) {
            (Some(draft), Some(note)) => draft.id == note.id,
            _ => false,
        };
        if same_note {
            return;
        }
        self.pipeline.select(note.as_ref());
        self.draft = note;
        self.dirty_since = None;
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        self.edit(|draft| {
            draft.title = title;
            Ok(())
        })
    }

    pub fn set_content(&mut self, content: impl Into<String>) -> Result<()> {
        let content = content.into();
        self.edit(|draft| {
            draft.content = content;
            Ok(())
        })
    }

    /// Replace the tag at `index`.
    pub fn set_tag(&mut self, index: usize, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.edit(|draft| {
            let tag = draft.tags.get_mut(index).ok_or_else(|| tag_out_of_range(index))?;
            *tag = value;
            Ok(())
        })
    }

    /// Append an empty tag for the user to fill in.
    pub fn add_tag(&mut self) -> Result<()> {
        self.edit(|draft| {
            draft.tags.push(String::new());
            Ok(())
        })
    }

    pub fn remove_tag(&mut self, index: usize) -> Result<()> {
        self.edit(|draft| {
            if index >= draft.tags.len() {
                return Err(tag_out_of_range(index));
            }
            draft.tags.remove(index);
            Ok(())
        })
    }

    pub fn set_tags(&mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Result<()> {
        let tags = tags.into_iter().map(Into::into).collect();
        self.edit(|draft| {
            draft.tags = tags;
            Ok(())
        })
    }

    /// Close the session if `id` is the open note. Returns whether it was.
    pub fn note_removed(&mut self, id: &NoteId) -> bool {
        if self.draft.as_ref().is_some_and(|draft| &draft.id == id) {
            self.pipeline.cancel();
            self.select(None);
            true
        } else {
            false
        }
    }

    pub fn mark_saved(&mut self) {
        self.dirty_since = None;
    }

    /// Follow a store change: close the draft if its note is gone, and clear
    /// the dirty marker once the store holds exactly the draft's text.
    pub fn sync_with_store(&mut self, snapshot: &StoreSnapshot) {
        let Some(draft) = &self.draft else {
            return;
        };
        match snapshot.note(&draft.id) {
            None => {
                let id = draft.id.clone();
                tracing::debug!(note_id = %id, "Open note was removed");
                self.note_removed(&id);
            }
            Some(stored) if stored.same_editable_fields(draft) => self.mark_saved(),
            Some(_) => {}
        }
    }

    /// Save pending changes now instead of waiting for the quiet period.
    pub fn flush(&self) -> bool {
        self.pipeline.flush()
    }

    fn edit(&mut self, apply: impl FnOnce(&mut Note) -> Result<()>) -> Result<()> {
        let draft = self
            .draft
            .as_mut()
            .ok_or_else(|| Error::InvalidInput("No note is open for editing".to_string()))?;
        let before = draft.clone();
        apply(draft)?;
        if draft.same_editable_fields(&before) {
            return Ok(());
        }
        self.dirty_since = Some(Utc::now());
        self.pipeline.edit(draft);
        Ok(())
    }
}

fn tag_out_of_range(index: usize) -> Error {
    Error::InvalidInput(format!("No tag at position {index}"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::autosave::AutosaveState;
    use crate::remote::ApiError;
    use crate::store::NoteStore;
    use crate::test_support::{note, FakeNotesApi, Op};

    fn id(raw: &str) -> NoteId {
        raw.parse().unwrap()
    }

    async fn session_with(notes: Vec<Note>) -> EditSession<FakeNotesApi> {
        let store = NoteStore::new(FakeNotesApi::with_notes(notes));
        store.load().await.unwrap();
        EditSession::new(AutosavePipeline::new(store))
    }

    fn stored(session: &EditSession<FakeNotesApi>, raw: &str) -> Note {
        session.pipeline().store().note(&id(raw)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn field_edits_are_autosaved_together() {
        let original = note("a", "Groceries", "milk", &["home"]);
        let mut session = session_with(vec![original.clone()]).await;
        session.select(Some(original));

        session.set_title("Shopping").unwrap();
        session.set_content("milk, eggs").unwrap();
        session.add_tag().unwrap();
        session.set_tag(1, "errands").unwrap();
        assert!(session.is_dirty());

        session.pipeline().settled().await;
        let saved = stored(&session, "a");
        assert_eq!(saved.title, "Shopping");
        assert_eq!(saved.content, "milk, eggs");
        assert_eq!(saved.tags, vec!["home", "errands"]);
        assert_eq!(session.pipeline().store().api().update_calls().len(), 1);

        session.sync_with_store(&session.pipeline().store().snapshot());
        assert!(!session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn editing_without_open_note_is_rejected() {
        let mut session = session_with(Vec::new()).await;
        assert!(matches!(
            session.set_title("x"),
            Err(Error::InvalidInput(_))
        ));
        assert!(session.draft().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn tag_index_out_of_range_is_rejected() {
        let original = note("a", "A", "", &["one"]);
        let mut session = session_with(vec![original.clone()]).await;
        session.select(Some(original));

        assert!(session.set_tag(3, "x").is_err());
        assert!(session.remove_tag(1).is_err());
        assert!(!session.is_dirty());
        assert_eq!(session.pipeline().state(), AutosaveState::Idle);

        session.remove_tag(0).unwrap();
        assert!(session.draft().unwrap().tags.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn setting_identical_value_is_not_an_edit() {
        let original = note("a", "Same", "", &[]);
        let mut session = session_with(vec![original.clone()]).await;
        session.select(Some(original));

        session.set_title("Same").unwrap();
        assert!(session.dirty_since().is_none());
        assert_eq!(session.pipeline().state(), AutosaveState::Idle);
    }

    #[tokio::test]
    async fn dirty_since_follows_latest_keystroke() {
        let original = note("a", "Title", "", &[]);
        let mut session = session_with(vec![original.clone()]).await;
        session.select(Some(original));

        session.set_content("h").unwrap();
        let first = session.dirty_since().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.set_content("he").unwrap();
        let second = session.dirty_since().unwrap();
        assert!(second > first);

        session.set_content("he").unwrap();
        assert_eq!(session.dirty_since(), Some(second));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_keeps_draft() {
        let original = note("a", "Title", "", &[]);
        let mut session = session_with(vec![original.clone()]).await;
        session
            .pipeline()
            .store()
            .api()
            .fail_next(Op::Update, ApiError::validation("Title too long (422)"));
        session.select(Some(original));

        session.set_title("A much longer title").unwrap();
        session.pipeline().settled().await;

        session.sync_with_store(&session.pipeline().store().snapshot());
        assert_eq!(session.draft().unwrap().title, "A much longer title");
        assert!(session.is_dirty());
        assert_eq!(stored(&session, "a").title, "Title");
    }

    #[tokio::test(start_paused = true)]
    async fn switching_note_discards_unsaved_draft() {
        let a = note("a", "A", "", &[]);
        let b = note("b", "B", "", &[]);
        let mut session = session_with(vec![a.clone(), b.clone()]).await;

        session.select(Some(a));
        session.set_content("draft for a").unwrap();
        session.select(Some(b));
        assert_eq!(session.draft().unwrap().id, id("b"));
        assert!(!session.is_dirty());

        session.set_content("draft for b").unwrap();
        session.pipeline().settled().await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        let calls = session.pipeline().store().api().update_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, id("b"));
        assert_eq!(stored(&session, "a").content, "");
    }

    #[tokio::test(start_paused = true)]
    async fn reselecting_open_note_keeps_draft() {
        let original = note("a", "A", "", &[]);
        let mut session = session_with(vec![original.clone()]).await;
        session.select(Some(original.clone()));
        session.set_content("typing").unwrap();

        session.select(Some(original));
        assert_eq!(session.draft().unwrap().content, "typing");
        assert!(session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn removing_open_note_closes_session() {
        let original = note("a", "A", "", &[]);
        let mut session = session_with(vec![original.clone()]).await;
        session.select(Some(original));
        session.set_content("doomed").unwrap();

        assert!(!session.note_removed(&id("other")));
        assert!(session.note_removed(&id("a")));
        assert!(session.draft().is_none());
        assert_eq!(session.pipeline().state(), AutosaveState::Idle);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(session.pipeline().store().api().update_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn store_removal_closes_session() {
        let original = note("a", "A", "", &[]);
        let mut session = session_with(vec![original.clone()]).await;
        session.select(Some(original));

        session.pipeline().store().remove(&id("a")).await.unwrap();
        session.sync_with_store(&session.pipeline().store().snapshot());
        assert!(session.draft().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn set_tags_replaces_sequence() {
        let original = note("a", "A", "", &["old"]);
        let mut session = session_with(vec![original.clone()]).await;
        session.select(Some(original));

        session.set_tags(["x", "y"]).unwrap();
        assert!(session.flush());
        session.pipeline().settled().await;
        assert_eq!(stored(&session, "a").tags, vec!["x", "y"]);
    }
}
