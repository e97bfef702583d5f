//! Debounced autosave.
//!
//! Edits to the open note are collapsed into a single [`NoteStore::update`]
//! once the note has been quiet for [`AUTOSAVE_DEBOUNCE`]. Each new edit
//! restarts the deadline. Saves run detached from the pipeline: cancelling or
//! replacing a pending save never aborts a request that is already in flight,
//! and a failed save is left in the store's `last_error` without retrying.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::ClientConfig;
use crate::models::{Note, NoteId, NotePatch};
use crate::remote::NotesApi;
use crate::store::NoteStore;

mod task;

pub use task::ScheduledTask;

/// Quiet period after the last edit before a save is issued.
pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_secs(1);

/// Observable pipeline state.
///
/// A pending edit takes precedence over saves still in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AutosaveState {
    #[default]
    Idle,
    PendingEdit { note_id: NoteId, deadline: Instant },
    Saving { note_id: NoteId },
}

impl AutosaveState {
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

struct PendingSave {
    draft: Note,
    deadline: Instant,
    generation: u64,
    timer: ScheduledTask,
}

#[derive(Default)]
struct PipelineState {
    /// Last draft seen for the open note, used to ignore no-op edits
    last_seen: Option<Note>,
    pending: Option<PendingSave>,
    /// Identifiers of saves in flight, oldest first
    saving: Vec<NoteId>,
    generation: u64,
    flush_on_switch: bool,
}

impl PipelineState {
    fn current(&self) -> AutosaveState {
        if let Some(pending) = &self.pending {
            return AutosaveState::PendingEdit {
                note_id: pending.draft.id.clone(),
                deadline: pending.deadline,
            };
        }
        self.saving
            .last()
            .map_or(AutosaveState::Idle, |note_id| AutosaveState::Saving {
                note_id: note_id.clone(),
            })
    }
}

struct Inner<A> {
    store: NoteStore<A>,
    debounce: Duration,
    state: Mutex<PipelineState>,
    states: watch::Sender<AutosaveState>,
}

impl<A: NotesApi + 'static> Inner<A> {
    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &PipelineState) {
        self.states.send_if_modified(|current| {
            let next = state.current();
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Restart the debounce deadline for `draft`, replacing any pending save.
    fn schedule(self: &Arc<Self>, state: &mut PipelineState, draft: Note) {
        state.generation += 1;
        let generation = state.generation;
        let deadline = Instant::now() + self.debounce;
        let weak = Arc::downgrade(self);
        let timer = ScheduledTask::at(deadline, async move {
            if let Some(inner) = weak.upgrade() {
                inner.deadline_elapsed(generation);
            }
        });
        // Dropping the replaced save cancels its timer.
        state.pending = Some(PendingSave {
            draft,
            deadline,
            generation,
            timer,
        });
    }

    fn deadline_elapsed(self: &Arc<Self>, generation: u64) {
        let mut state = self.lock();
        let current = state
            .pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation);
        if !current {
            return;
        }
        if let Some(pending) = state.pending.take() {
            // We are running on the timer's own task.
            pending.timer.detach();
            self.start_save(&mut state, pending.draft);
        }
        self.publish(&state);
    }

    fn start_save(self: &Arc<Self>, state: &mut PipelineState, draft: Note) {
        let note_id = draft.id.clone();
        state.saving.push(note_id.clone());
        tracing::debug!(note_id = %note_id, "Autosaving note");

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let patch = NotePatch::from_note(&draft);
            match inner.store.update(&note_id, &patch).await {
                Ok(_) => tracing::debug!(note_id = %note_id, "Autosaved note"),
                Err(error) => tracing::error!(note_id = %note_id, "Failed to autosave note: {error}"),
            }
            inner.save_finished(&note_id);
        });
    }

    fn save_finished(&self, note_id: &NoteId) {
        let mut state = self.lock();
        if let Some(index) = state.saving.iter().position(|id| id == note_id) {
            state.saving.remove(index);
        }
        self.publish(&state);
    }

    /// Settle the pending save when the open note becomes `next`.
    fn leave(self: &Arc<Self>, state: &mut PipelineState, next: Option<&NoteId>) {
        let switching = state
            .pending
            .as_ref()
            .is_some_and(|pending| Some(&pending.draft.id) != next);
        if !switching {
            return;
        }
        let Some(pending) = state.pending.take() else {
            return;
        };
        if state.flush_on_switch {
            tracing::debug!(note_id = %pending.draft.id, "Flushing autosave on note switch");
            self.start_save(state, pending.draft);
        } else {
            tracing::warn!(
                note_id = %pending.draft.id,
                "Discarding unsaved changes of previously open note"
            );
        }
    }
}

/// Debounced autosave for the note being edited.
///
/// Requires a tokio runtime: timers and saves are spawned tasks.
pub struct AutosavePipeline<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for AutosavePipeline<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: NotesApi + 'static> AutosavePipeline<A> {
    pub fn new(store: NoteStore<A>) -> Self {
        Self::with_debounce(store, AUTOSAVE_DEBOUNCE)
    }

    pub fn with_debounce(store: NoteStore<A>, debounce: Duration) -> Self {
        let (states, _) = watch::channel(AutosaveState::Idle);
        Self {
            inner: Arc::new(Inner {
                store,
                debounce,
                state: Mutex::new(PipelineState::default()),
                states,
            }),
        }
    }

    pub fn from_config(store: NoteStore<A>, config: &ClientConfig) -> Self {
        let pipeline = Self::new(store);
        pipeline.set_flush_on_switch(config.flush_on_switch);
        pipeline
    }

    pub fn store(&self) -> &NoteStore<A> {
        &self.inner.store
    }

    /// Save the pending edit immediately instead of discarding it when the
    /// open note changes.
    pub fn set_flush_on_switch(&self, enabled: bool) {
        self.inner.lock().flush_on_switch = enabled;
    }

    pub fn state(&self) -> AutosaveState {
        self.inner.states.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutosaveState> {
        self.inner.states.subscribe()
    }

    /// Make `note` the open note, settling a pending save for any other note.
    pub fn select(&self, note: Option<&Note>) {
        let mut state = self.inner.lock();
        self.inner.leave(&mut state, note.map(|note| &note.id));
        state.last_seen = state
            .pending
            .as_ref()
            .map(|pending| pending.draft.clone())
            .or_else(|| note.cloned());
        self.inner.publish(&state);
    }

    /// Record the full current draft of the open note.
    ///
    /// Starts or restarts the debounce deadline unless title, content and
    /// tags all equal the last draft seen for that note.
    pub fn edit(&self, draft: &Note) {
        let mut state = self.inner.lock();
        let unchanged = state
            .last_seen
            .as_ref()
            .is_some_and(|seen| seen.id == draft.id && seen.same_editable_fields(draft));
        if unchanged {
            tracing::trace!(note_id = %draft.id, "Ignoring edit without changes");
            return;
        }

        self.inner.leave(&mut state, Some(&draft.id));
        state.last_seen = Some(draft.clone());
        self.inner.schedule(&mut state, draft.clone());
        self.inner.publish(&state);
    }

    /// Issue the pending save now. Returns whether there was one.
    pub fn flush(&self) -> bool {
        let mut state = self.inner.lock();
        let Some(pending) = state.pending.take() else {
            return false;
        };
        self.inner.start_save(&mut state, pending.draft);
        self.inner.publish(&state);
        true
    }

    /// Abandon the pending save. Saves already in flight are unaffected.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.lock();
        let cancelled = state.pending.take().is_some();
        if cancelled {
            tracing::debug!("Cancelled pending autosave");
        }
        self.inner.publish(&state);
        cancelled
    }

    /// Wait until nothing is pending and no save is in flight.
    pub async fn settled(&self) {
        let mut states = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = states.wait_for(AutosaveState::is_idle).await;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::remote::{ApiError, ApiErrorKind};
    use crate::test_support::{note, FakeNotesApi, Op};

    fn id(raw: &str) -> NoteId {
        raw.parse().unwrap()
    }

    fn with_content(note: &Note, content: &str) -> Note {
        let mut draft = note.clone();
        draft.content = content.to_string();
        draft
    }

    async fn pipeline_with(notes: Vec<Note>) -> AutosavePipeline<FakeNotesApi> {
        let store = NoteStore::new(FakeNotesApi::with_notes(notes));
        store.load().await.unwrap();
        AutosavePipeline::new(store)
    }

    fn saved_contents(pipeline: &AutosavePipeline<FakeNotesApi>) -> Vec<(String, String)> {
        pipeline
            .store()
            .api()
            .update_calls()
            .into_iter()
            .map(|(id, patch)| (id.to_string(), patch.content.unwrap_or_default()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn edits_within_quiet_period_collapse_into_one_save() {
        let original = note("a", "Plan", "", &[]);
        let pipeline = pipeline_with(vec![original.clone()]).await;
        pipeline.select(Some(&original));

        pipeline.edit(&with_content(&original, "h"));
        tokio::time::advance(Duration::from_millis(300)).await;
        pipeline.edit(&with_content(&original, "he"));
        tokio::time::advance(Duration::from_millis(300)).await;
        pipeline.edit(&with_content(&original, "hey"));
        assert!(matches!(pipeline.state(), AutosaveState::PendingEdit { .. }));

        pipeline.settled().await;
        assert_eq!(
            saved_contents(&pipeline),
            vec![("a".to_string(), "hey".to_string())]
        );
        assert_eq!(pipeline.store().note(&id("a")).unwrap().content, "hey");
    }

    #[tokio::test(start_paused = true)]
    async fn each_edit_restarts_the_deadline() {
        let original = note("a", "Plan", "", &[]);
        let pipeline = pipeline_with(vec![original.clone()]).await;
        pipeline.select(Some(&original));

        pipeline.edit(&with_content(&original, "one"));
        tokio::time::advance(Duration::from_millis(900)).await;
        pipeline.edit(&with_content(&original, "two"));
        tokio::time::advance(Duration::from_millis(900)).await;
        tokio::task::yield_now().await;
        assert!(saved_contents(&pipeline).is_empty());

        let AutosaveState::PendingEdit { note_id, deadline } = pipeline.state() else {
            panic!("expected a pending edit");
        };
        assert_eq!(note_id, id("a"));
        assert!(deadline > Instant::now());

        pipeline.settled().await;
        assert_eq!(saved_contents(&pipeline).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_notes_discards_pending_save_by_default() {
        let a = note("a", "A", "", &[]);
        let b = note("b", "B", "", &[]);
        let pipeline = pipeline_with(vec![a.clone(), b.clone()]).await;

        pipeline.select(Some(&a));
        pipeline.edit(&with_content(&a, "lost"));
        pipeline.select(Some(&b));
        pipeline.edit(&with_content(&b, "kept"));

        pipeline.settled().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(
            saved_contents(&pipeline),
            vec![("b".to_string(), "kept".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn switching_notes_flushes_when_enabled() {
        let a = note("a", "A", "", &[]);
        let b = note("b", "B", "", &[]);
        let pipeline = pipeline_with(vec![a.clone(), b.clone()]).await;
        pipeline.set_flush_on_switch(true);

        pipeline.select(Some(&a));
        pipeline.edit(&with_content(&a, "first"));
        pipeline.select(Some(&b));
        assert_eq!(
            pipeline.state(),
            AutosaveState::Saving {
                note_id: id("a")
            }
        );
        pipeline.edit(&with_content(&b, "second"));

        pipeline.settled().await;
        assert_eq!(
            saved_contents(&pipeline),
            vec![
                ("a".to_string(), "first".to_string()),
                ("b".to_string(), "second".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_draft_is_ignored() {
        let original = note("a", "Plan", "body", &["work"]);
        let pipeline = pipeline_with(vec![original.clone()]).await;
        pipeline.select(Some(&original));

        let mut same = original.clone();
        same.pinned = true;
        pipeline.edit(&same);
        assert_eq!(pipeline.state(), AutosaveState::Idle);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(saved_contents(&pipeline).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reverting_to_saved_text_still_counts_as_an_edit() {
        let original = note("a", "Plan", "body", &[]);
        let pipeline = pipeline_with(vec![original.clone()]).await;
        pipeline.select(Some(&original));

        pipeline.edit(&with_content(&original, "body!"));
        pipeline.edit(&original);

        pipeline.settled().await;
        assert_eq!(
            saved_contents(&pipeline),
            vec![("a".to_string(), "body".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_not_retried() {
        let original = note("a", "Plan", "", &[]);
        let pipeline = pipeline_with(vec![original.clone()]).await;
        pipeline
            .store()
            .api()
            .fail_next(Op::Update, ApiError::transport("connection reset"));
        pipeline.select(Some(&original));

        pipeline.edit(&with_content(&original, "unsaved"));
        pipeline.settled().await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(saved_contents(&pipeline).len(), 1);
        assert_eq!(pipeline.state(), AutosaveState::Idle);
        let snapshot = pipeline.store().snapshot();
        assert_eq!(snapshot.note(&id("a")).unwrap().content, "");
        assert_eq!(
            snapshot.last_error.map(|error| error.kind()),
            Some(ApiErrorKind::Transport)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn flush_saves_immediately() {
        let original = note("a", "Plan", "", &[]);
        let pipeline = pipeline_with(vec![original.clone()]).await;
        pipeline.select(Some(&original));

        assert!(!pipeline.flush());
        pipeline.edit(&with_content(&original, "now"));
        assert!(pipeline.flush());
        assert_eq!(
            pipeline.state(),
            AutosaveState::Saving {
                note_id: id("a")
            }
        );

        pipeline.settled().await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            saved_contents(&pipeline),
            vec![("a".to_string(), "now".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_abandons_pending_save() {
        let original = note("a", "Plan", "", &[]);
        let pipeline = pipeline_with(vec![original.clone()]).await;
        pipeline.select(Some(&original));

        pipeline.edit(&with_content(&original, "never"));
        assert!(pipeline.cancel());
        assert!(!pipeline.cancel());
        assert_eq!(pipeline.state(), AutosaveState::Idle);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(saved_contents(&pipeline).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_note_does_not_abort_in_flight_save() {
        let original = note("a", "Plan", "", &[]);
        let pipeline = pipeline_with(vec![original.clone()]).await;
        let api = pipeline.store().api().clone();
        pipeline.select(Some(&original));
        api.hold();

        pipeline.edit(&with_content(&original, "in flight"));
        tokio::time::sleep(AUTOSAVE_DEBOUNCE + Duration::from_millis(10)).await;
        api.wait_for_parked(1).await;
        assert_eq!(
            pipeline.state(),
            AutosaveState::Saving {
                note_id: id("a")
            }
        );

        pipeline.select(None);
        assert!(!pipeline.cancel());
        api.release_all();

        pipeline.settled().await;
        assert_eq!(pipeline.store().note(&id("a")).unwrap().content, "in flight");
    }

    #[tokio::test(start_paused = true)]
    async fn pending_edit_outranks_save_in_flight() {
        let original = note("a", "Plan", "", &[]);
        let pipeline = pipeline_with(vec![original.clone()]).await;
        let api = pipeline.store().api().clone();
        pipeline.select(Some(&original));
        api.hold();

        pipeline.edit(&with_content(&original, "v1"));
        assert!(pipeline.flush());
        api.wait_for_parked(1).await;
        pipeline.edit(&with_content(&original, "v2"));
        assert!(matches!(pipeline.state(), AutosaveState::PendingEdit { .. }));

        api.release_all();
        pipeline.settled().await;
        assert_eq!(
            saved_contents(&pipeline),
            vec![
                ("a".to_string(), "v1".to_string()),
                ("a".to_string(), "v2".to_string()),
            ]
        );
    }
}
