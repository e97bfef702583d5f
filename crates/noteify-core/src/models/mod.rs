//! Data models for Noteify

mod note;

pub use note::{InvalidNoteId, NewNote, Note, NoteId, NotePatch, UNTITLED_NOTE_TITLE};
