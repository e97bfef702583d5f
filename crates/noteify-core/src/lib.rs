//! noteify-core - Core library for Noteify
//!
//! This crate contains the client-side note synchronization layer shared by
//! every Noteify front end: the remote notes client, the in-memory note store,
//! search/tag filtering, the debounced autosave pipeline and edit sessions.

pub mod autosave;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod remote;
pub mod session;
pub mod store;
pub mod summary;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use autosave::{AutosavePipeline, AutosaveState, AUTOSAVE_DEBOUNCE};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use filter::FilterState;
pub use models::{NewNote, Note, NoteId, NotePatch};
pub use remote::{ApiError, ApiErrorKind, NotesApi, RemoteNotesClient, StaticToken, TokenProvider};
pub use session::EditSession;
pub use store::{NoteStore, StoreError, StoreOperation, StoreSnapshot};
pub use summary::{SummaryClient, SummaryError};
