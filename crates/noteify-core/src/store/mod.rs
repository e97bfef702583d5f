//! In-memory note store.
//!
//! `NoteStore` owns the authoritative list of notes and funnels every change
//! through `load`, `create`, `update` and `remove`. Nothing is applied
//! optimistically: the list only ever reflects responses confirmed by the
//! remote collection, and whichever create/update response is processed last
//! wins for its identifier.
//!
//! Observers call [`NoteStore::subscribe`] and receive a fresh
//! [`StoreSnapshot`] after every change.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;

use crate::filter::{available_tags, visible_notes, FilterState};
use crate::models::{NewNote, Note, NoteId, NotePatch};
use crate::remote::{ApiError, ApiErrorKind, ApiResult, NotesApi};

/// Store operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Load,
    Create,
    Update,
    Remove,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load notes",
            Self::Create => "create note",
            Self::Update => "save note",
            Self::Remove => "delete note",
        })
    }
}

/// The error record kept in `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to {operation}: {error}")]
pub struct StoreError {
    pub operation: StoreOperation,
    pub note_id: Option<NoteId>,
    #[source]
    pub error: ApiError,
}

impl StoreError {
    #[must_use]
    pub const fn kind(&self) -> ApiErrorKind {
        self.error.kind
    }
}

/// Everything a front end needs to render the note list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Display order, newest created first
    pub all_notes: Arc<Vec<Note>>,
    pub visible_notes: Arc<Vec<Note>>,
    pub available_tags: Arc<Vec<String>>,
    pub search_query: String,
    pub selected_tags: BTreeSet<String>,
    pub fetching: bool,
    pub mutating: bool,
    pub last_error: Option<StoreError>,
}

impl StoreSnapshot {
    #[must_use]
    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.all_notes.iter().find(|note| &note.id == id)
    }
}

#[derive(Default)]
struct StoreState {
    notes: Arc<Vec<Note>>,
    filter: FilterState,
    fetching: usize,
    mutating: usize,
    last_error: Option<StoreError>,
}

impl StoreState {
    fn position(&self, id: &NoteId) -> Option<usize> {
        self.notes.iter().position(|note| &note.id == id)
    }

    fn contains(&self, id: &NoteId) -> bool {
        self.position(id).is_some()
    }

    /// Full-list replacement; a repeated identifier keeps its first occurrence.
    fn replace_all(&mut self, notes: Vec<Note>) {
        let mut seen = BTreeSet::new();
        let mut unique = Vec::with_capacity(notes.len());
        for note in notes {
            if seen.insert(note.id.clone()) {
                unique.push(note);
            } else {
                tracing::warn!(note_id = %note.id, "Dropping duplicate note from list response");
            }
        }
        self.notes = Arc::new(unique);
    }

    fn upsert_front(&mut self, note: Note) {
        let notes = Arc::make_mut(&mut self.notes);
        if let Some(index) = notes.iter().position(|existing| existing.id == note.id) {
            notes[index] = note;
        } else {
            notes.insert(0, note);
        }
    }

    fn replace_existing(&mut self, note: Note) -> bool {
        let Some(index) = self.position(&note.id) else {
            return false;
        };
        Arc::make_mut(&mut self.notes)[index] = note;
        true
    }

    fn remove(&mut self, id: &NoteId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        Arc::make_mut(&mut self.notes).remove(index);
        true
    }

    fn record_failure(&mut self, operation: StoreOperation, note_id: Option<&NoteId>, error: &ApiError) {
        // A vanished note that is already gone locally is not worth reporting.
        if error.kind == ApiErrorKind::NotFound {
            if let Some(id) = note_id {
                if !self.contains(id) {
                    tracing::debug!(note_id = %id, %operation, "Ignoring not-found for locally removed note");
                    return;
                }
            }
        }
        tracing::warn!(%operation, kind = %error.kind, "{}", error.message);
        self.last_error = Some(StoreError {
            operation,
            note_id: note_id.cloned(),
            error: error.clone(),
        });
    }

    fn snapshot(&self, previous: &StoreSnapshot) -> StoreSnapshot {
        let visible = visible_notes(&self.notes, &self.filter);
        let visible_notes = if *previous.visible_notes == visible {
            previous.visible_notes.clone()
        } else {
            Arc::new(visible)
        };
        let tags = available_tags(&self.notes);
        let available_tags = if *previous.available_tags == tags {
            previous.available_tags.clone()
        } else {
            Arc::new(tags)
        };

        StoreSnapshot {
            all_notes: self.notes.clone(),
            visible_notes,
            available_tags,
            search_query: self.filter.search_query.clone(),
            selected_tags: self.filter.selected_tags.clone(),
            fetching: self.fetching > 0,
            mutating: self.mutating > 0,
            last_error: self.last_error.clone(),
        }
    }
}

#[derive(Clone, Copy)]
enum Counter {
    Fetch,
    Mutation,
}

struct Inner<A> {
    api: A,
    state: Mutex<StoreState>,
    snapshots: watch::Sender<StoreSnapshot>,
}

impl<A> Inner<A> {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the state while the lock is still held so snapshots arrive in order.
    fn publish(&self, state: &StoreState) {
        self.snapshots.send_if_modified(|current| {
            let next = state.snapshot(current);
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn mutate<R>(&self, apply: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.lock();
        let result = apply(&mut state);
        self.publish(&state);
        result
    }
}

/// An in-flight request counted in `fetching` or `mutating`.
///
/// The counter is released exactly once: by [`InFlight::finish`] when the
/// response is processed, or on drop if the request future was abandoned.
struct InFlight<'a, A> {
    inner: &'a Inner<A>,
    counter: Counter,
    done: bool,
}

impl<'a, A> InFlight<'a, A> {
    fn begin(inner: &'a Inner<A>, counter: Counter) -> Self {
        inner.mutate(|state| match counter {
            Counter::Fetch => state.fetching += 1,
            Counter::Mutation => state.mutating += 1,
        });
        Self {
            inner,
            counter,
            done: false,
        }
    }

    fn release(counter: Counter, state: &mut StoreState) {
        match counter {
            Counter::Fetch => state.fetching = state.fetching.saturating_sub(1),
            Counter::Mutation => state.mutating = state.mutating.saturating_sub(1),
        }
    }

    /// Apply the response and release the counter in one published change.
    fn finish<R>(mut self, apply: impl FnOnce(&mut StoreState) -> R) -> R {
        self.done = true;
        let counter = self.counter;
        self.inner.mutate(|state| {
            let result = apply(state);
            Self::release(counter, state);
            result
        })
    }
}

impl<A> Drop for InFlight<'_, A> {
    fn drop(&mut self) {
        if !self.done {
            let counter = self.counter;
            self.inner.mutate(|state| Self::release(counter, state));
        }
    }
}

/// Single source of truth for notes and in-flight request bookkeeping.
pub struct NoteStore<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for NoteStore<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: NotesApi> NoteStore<A> {
    pub fn new(api: A) -> Self {
        let (snapshots, _) = watch::channel(StoreSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                api,
                state: Mutex::new(StoreState::default()),
                snapshots,
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.inner.api
    }

    /// Current state, including the derived visible list.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Receiver that observes every published change.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Copy of a single note as last confirmed by the remote.
    pub fn note(&self, id: &NoteId) -> Option<Note> {
        self.inner.lock().notes.iter().find(|note| &note.id == id).cloned()
    }

    /// Replace the whole list with the remote collection.
    ///
    /// On failure the previous list stays available and the error is recorded.
    pub async fn load(&self) -> ApiResult<()> {
        let in_flight = InFlight::begin(&self.inner, Counter::Fetch);
        let result = self.inner.api.list().await;
        in_flight.finish(|state| match result {
            Ok(notes) => {
                tracing::debug!(count = notes.len(), "Loaded notes");
                state.replace_all(notes);
                state.last_error = None;
                Ok(())
            }
            Err(error) => {
                state.record_failure(StoreOperation::Load, None, &error);
                Err(error)
            }
        })
    }

    /// Create a note remotely and insert the confirmed note at the front.
    pub async fn create(&self, new_note: &NewNote) -> ApiResult<Note> {
        let in_flight = InFlight::begin(&self.inner, Counter::Mutation);
        let result = self.inner.api.create(new_note).await;
        in_flight.finish(|state| match result {
            Ok(note) => {
                tracing::debug!(note_id = %note.id, "Created note");
                state.upsert_front(note.clone());
                state.last_error = None;
                Ok(note)
            }
            Err(error) => {
                state.record_failure(StoreOperation::Create, None, &error);
                Err(error)
            }
        })
    }

    /// Update a note remotely and replace the local entry with the response.
    ///
    /// The local entry is untouched until the remote confirms. A response for
    /// a note that has meanwhile been removed is dropped.
    pub async fn update(&self, id: &NoteId, patch: &NotePatch) -> ApiResult<Note> {
        let in_flight = InFlight::begin(&self.inner, Counter::Mutation);
        let result = self.inner.api.update(id, patch).await;
        in_flight.finish(|state| match result {
            Ok(note) => {
                if state.replace_existing(note.clone()) {
                    tracing::debug!(note_id = %note.id, "Saved note");
                } else {
                    tracing::debug!(note_id = %note.id, "Dropping update for removed note");
                }
                state.last_error = None;
                Ok(note)
            }
            Err(error) => {
                state.record_failure(StoreOperation::Update, Some(id), &error);
                Err(error)
            }
        })
    }

    /// Delete a note remotely, then remove it locally.
    pub async fn remove(&self, id: &NoteId) -> ApiResult<()> {
        let in_flight = InFlight::begin(&self.inner, Counter::Mutation);
        let result = self.inner.api.delete(id).await;
        in_flight.finish(|state| match result {
            Ok(()) => {
                if state.remove(id) {
                    tracing::debug!(note_id = %id, "Removed note");
                }
                state.last_error = None;
                Ok(())
            }
            Err(error) => {
                state.record_failure(StoreOperation::Remove, Some(id), &error);
                Err(error)
            }
        })
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.inner.mutate(|state| state.filter.search_query = query);
    }

    pub fn set_selected_tags(&self, tags: impl IntoIterator<Item = impl Into<String>>) {
        let tags = tags.into_iter().map(Into::into).collect();
        self.inner.mutate(|state| state.filter.selected_tags = tags);
    }

    pub fn toggle_tag(&self, tag: impl Into<String>) {
        let tag = tag.into();
        self.inner.mutate(|state| state.filter.toggle_tag(tag));
    }

    /// Clear `last_error` without retrying anything.
    pub fn dismiss_error(&self) {
        self.inner.mutate(|state| state.last_error = None);
    }
}
