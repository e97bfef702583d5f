//! Shared test helpers: note fixtures and an in-memory notes API.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::models::{NewNote, Note, NoteId, NotePatch};
use crate::remote::{ApiError, ApiResult, NotesApi};

pub fn note(id: &str, title: &str, content: &str, tags: &[&str]) -> Note {
    Note {
        id: id.parse().expect("fixture id"),
        title: title.to_string(),
        content: content.to_string(),
        tags: tags.iter().map(ToString::to_string).collect(),
        pinned: false,
        archived: false,
        reminder_date: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(NewNote),
    Update(NoteId, NotePatch),
    Delete(NoteId),
}

#[derive(Default)]
struct FakeState {
    notes: Vec<Note>,
    calls: Vec<Call>,
    failures: HashMap<Op, VecDeque<ApiError>>,
    held: bool,
    waiters: Vec<Option<oneshot::Sender<()>>>,
}

/// In-memory stand-in for the remote collection.
///
/// While held, every call parks until released by arrival index, which lets
/// tests choose the order responses are processed in.
#[derive(Clone, Default)]
pub struct FakeNotesApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeNotesApi {
    pub fn with_notes(notes: Vec<Note>) -> Self {
        let api = Self::default();
        api.state.lock().unwrap().notes = notes;
        api
    }

    pub fn fail_next(&self, op: Op, error: ApiError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    pub fn hold(&self) {
        self.state.lock().unwrap().held = true;
    }

    /// Release the `index`-th parked call (in arrival order).
    pub fn release(&self, index: usize) {
        let sender = self.state.lock().unwrap().waiters[index].take();
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
    }

    pub fn release_all(&self) {
        let mut state = self.state.lock().unwrap();
        state.held = false;
        for sender in state.waiters.iter_mut().filter_map(Option::take) {
            let _ = sender.send(());
        }
    }

    /// Number of calls that have arrived while held
    pub fn parked(&self) -> usize {
        self.state.lock().unwrap().waiters.len()
    }

    pub async fn wait_for_parked(&self, count: usize) {
        while self.parked() < count {
            tokio::task::yield_now().await;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn update_calls(&self) -> Vec<(NoteId, NotePatch)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update(id, patch) => Some((id, patch)),
                _ => None,
            })
            .collect()
    }

    pub fn remote_notes(&self) -> Vec<Note> {
        self.state.lock().unwrap().notes.clone()
    }

    /// Record the call and compute its response, then park if held.
    ///
    /// The remote state changes on arrival; only delivery of the response
    /// waits for release.
    async fn respond<T>(
        &self,
        op: Op,
        call: Call,
        apply: impl FnOnce(&mut Vec<Note>) -> ApiResult<T>,
    ) -> ApiResult<T> {
        let (result, parked) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call);
            let result = match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
                Some(error) => Err(error),
                None => apply(&mut state.notes),
            };
            let parked = if state.held {
                let (sender, receiver) = oneshot::channel();
                state.waiters.push(Some(sender));
                Some(receiver)
            } else {
                None
            };
            (result, parked)
        };
        if let Some(receiver) = parked {
            let _ = receiver.await;
        }
        result
    }
}

impl NotesApi for FakeNotesApi {
    async fn list(&self) -> ApiResult<Vec<Note>> {
        self.respond(Op::List, Call::List, |notes| Ok(notes.clone()))
            .await
    }

    async fn create(&self, new_note: &NewNote) -> ApiResult<Note> {
        let call = Call::Create(new_note.clone());
        self.respond(Op::Create, call, |notes| {
            let created = Note {
                id: Uuid::now_v7().to_string().parse().expect("uuid id"),
                title: new_note.title.clone(),
                content: new_note.content.clone(),
                tags: new_note.tags.clone(),
                pinned: new_note.pinned,
                archived: new_note.archived,
                reminder_date: new_note.reminder_date,
            };
            notes.insert(0, created.clone());
            Ok(created)
        })
        .await
    }

    async fn update(&self, id: &NoteId, patch: &NotePatch) -> ApiResult<Note> {
        let call = Call::Update(id.clone(), patch.clone());
        self.respond(Op::Update, call, |notes| {
            let stored = notes
                .iter_mut()
                .find(|note| &note.id == id)
                .ok_or_else(|| ApiError::not_found("Note not found (404)"))?;
            patch.apply_to(stored);
            Ok(stored.clone())
        })
        .await
    }

    async fn delete(&self, id: &NoteId) -> ApiResult<()> {
        self.respond(Op::Delete, Call::Delete(id.clone()), |notes| {
            let before = notes.len();
            notes.retain(|note| &note.id != id);
            if notes.len() == before {
                return Err(ApiError::not_found("Note not found (404)"));
            }
            Ok(())
        })
        .await
    }
}
